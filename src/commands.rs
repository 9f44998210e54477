use crate::models::TemperatureUnits;
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = concat!(
    "commands: <n> | select <n> | menu | prefs | enable <n> | disable <n> | ",
    "units <c|f|k> | quit"
);

/// A line typed by the user on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Activate the n-th sensor menu item, counted from 1.
    Select(usize),
    Menu,
    Preferences,
    /// Enable the n-th sensor listed in preferences, counted from 1.
    Enable(usize),
    Disable(usize),
    Units(TemperatureUnits),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid index '{0}', expected a number from 1")]
    InvalidIndex(String),

    #[error("unknown units '{0}'")]
    InvalidUnits(String),
}

fn index(arg: Option<&str>, command: &'static str) -> Result<usize, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(command))?;
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidIndex(arg.to_string())),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(CommandError::Empty);
        };
        let arg = words.next();

        match word.to_lowercase().as_str() {
            "select" | "s" => index(arg, "select").map(Command::Select),
            "menu" | "m" => Ok(Command::Menu),
            "prefs" | "preferences" | "p" => Ok(Command::Preferences),
            "enable" | "e" => index(arg, "enable").map(Command::Enable),
            "disable" | "d" => index(arg, "disable").map(Command::Disable),
            "units" | "u" => {
                let arg = arg.ok_or(CommandError::MissingArgument("units"))?;
                arg.parse()
                    .map(Command::Units)
                    .map_err(|_| CommandError::InvalidUnits(arg.to_string()))
            }
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other if other.chars().all(|c| c.is_ascii_digit()) => {
                index(Some(other), "select").map(Command::Select)
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
