pub mod collectors;
pub mod commands;
pub mod config;
pub mod indicator;
pub mod manager;
pub mod models;

use crate::collectors::hwmon;
use crate::commands::{Command, HELP};
use crate::config::AppConfig;
use crate::indicator::menu::TextMenu;
use crate::indicator::panel::LogPanel;
use crate::indicator::{Indicator, IndicatorEvent};
use crate::manager::SensorManager;
use anyhow::Context;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub type ConsoleIndicator = Indicator<TextMenu, LogPanel>;

/// The indicator, its sensor manager and the channel joining them.
pub struct App {
    indicator: ConsoleIndicator,
    manager: SensorManager,
    events: UnboundedSender<IndicatorEvent>,
    hwmon_root: PathBuf,
}

impl App {
    /// Events on the returned receiver must be passed back to [`App::handle_event`].
    pub fn new(config: &AppConfig) -> (Self, UnboundedReceiver<IndicatorEvent>) {
        let (events, receiver) = unbounded_channel();
        let app = Self {
            indicator: Indicator::new(TextMenu::new(), LogPanel::default(), events.clone()),
            manager: SensorManager::from_config(config),
            events,
            hwmon_root: PathBuf::from(&config.indicator.hwmon_root),
        };
        (app, receiver)
    }

    pub fn indicator(&self) -> &ConsoleIndicator {
        &self.indicator
    }

    pub fn manager(&self) -> &SensorManager {
        &self.manager
    }

    /// Rescan hwmon and push the results through the manager.
    pub fn poll(&mut self) {
        let inputs = hwmon::scan(&self.hwmon_root);
        self.manager.sync(inputs, &mut self.indicator);
    }

    pub fn handle_event(&mut self, event: IndicatorEvent) {
        self.indicator.handle_event(event);
    }

    /// Returns false once the user asked to quit.
    pub fn handle_command(&mut self, command: Command) -> bool {
        debug!("Command {:?}", command);
        match command {
            Command::Select(n) => {
                let item = n
                    .checked_sub(1)
                    .and_then(|i| self.indicator.menu().item_at(i));
                match item {
                    // Queued like a click so it is handled in order with sensor updates
                    Some(item) => {
                        let _ = self.events.send(IndicatorEvent::ItemActivated(item));
                    }
                    None => warn!("No menu item {}", n),
                }
            }
            Command::Menu => print!("{}", self.indicator.menu().render()),
            Command::Preferences => print!("{}", self.indicator.open_preferences(&self.manager)),
            Command::Enable(n) | Command::Disable(n) => {
                let Some(path) = n
                    .checked_sub(1)
                    .and_then(|i| self.manager.path_at(i))
                    .map(str::to_string)
                else {
                    warn!("No sensor {}", n);
                    return true;
                };
                let changed = if matches!(command, Command::Enable(_)) {
                    self.manager.enable(&path, &mut self.indicator)
                } else {
                    self.manager.disable(&path, &mut self.indicator)
                };
                if !changed {
                    info!("Sensor {} unchanged", path);
                }
            }
            Command::Units(units) => self.manager.set_units(units),
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
        }
        true
    }
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting sensor indicator");

    match main_loop(config).await {
        Ok(_) => info!("Sensor indicator stopped"),
        Err(e) => {
            error!("Application error: {e:#}");
            // Print chain of error causes
            for cause in e.chain().skip(1) {
                error!("Caused by: {cause}");
            }
            return Err(e).context("Sensor indicator failed to run");
        }
    }

    Ok(())
}

async fn main_loop(config: AppConfig) -> anyhow::Result<()> {
    let (mut app, mut events) = App::new(&config);
    let mut interval = tokio::time::interval(config.poll_interval());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    debug!("Polling {} every {:?}", config.indicator.hwmon_root, config.poll_interval());
    println!("{}", HELP);

    loop {
        tokio::select! {
            _ = interval.tick() => app.poll(),
            Some(event) = events.recv() => app.handle_event(event),
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read command")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match line.parse::<Command>() {
                        Ok(command) => {
                            if !app.handle_command(command) {
                                break;
                            }
                        }
                        Err(e) => warn!("{}", e),
                    },
                    None => {
                        debug!("stdin closed, commands disabled");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    Ok(())
}
