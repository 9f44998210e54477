use log::warn;
use std::fmt;
use std::str::FromStr;

/// Display units for temperature sensors.
///
/// The discriminants match the raw values accepted by [`units_suffix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnits {
    #[default]
    Celsius = 0,
    Fahrenheit = 1,
    Kelvin = 2,
}

impl TemperatureUnits {
    /// Suffix appended to a reading. Kelvin carries no symbol.
    pub fn suffix(self) -> &'static str {
        match self {
            TemperatureUnits::Celsius => "°C",
            TemperatureUnits::Fahrenheit => "°F",
            TemperatureUnits::Kelvin => "",
        }
    }

    /// Convert a temperature in degrees Celsius into these units.
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnits::Celsius => celsius,
            TemperatureUnits::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
            TemperatureUnits::Kelvin => celsius + 273.15,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TemperatureUnits::Celsius => "celsius",
            TemperatureUnits::Fahrenheit => "fahrenheit",
            TemperatureUnits::Kelvin => "kelvin",
        }
    }

    /// Parse a unit name, falling back to Celsius with a warning.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            warn!("Unknown temperature units '{}', using celsius", value);
            TemperatureUnits::default()
        })
    }
}

impl TryFrom<i32> for TemperatureUnits {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(TemperatureUnits::Celsius),
            1 => Ok(TemperatureUnits::Fahrenheit),
            2 => Ok(TemperatureUnits::Kelvin),
            other => Err(other),
        }
    }
}

impl FromStr for TemperatureUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnits::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnits::Fahrenheit),
            "k" | "kelvin" => Ok(TemperatureUnits::Kelvin),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TemperatureUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a raw unit value to its display suffix.
///
/// Unrecognised values are not fatal: a warning is logged and the suffix is empty.
pub fn units_suffix(raw: i32) -> &'static str {
    match TemperatureUnits::try_from(raw) {
        Ok(units) => units.suffix(),
        Err(raw) => {
            warn!("Unable to convert temperature units {} to string", raw);
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::sync::Mutex;

    // Process wide, so other tests' records end up here too
    struct Capture(Mutex<Vec<(Level, String)>>);

    impl Log for Capture {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Warn
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                if let Ok(mut records) = self.0.lock() {
                    records.push((record.level(), record.args().to_string()));
                }
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    fn captured() -> &'static Capture {
        // Fails if already installed by an earlier test, which is fine
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(LevelFilter::Warn);
        &CAPTURE
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(TemperatureUnits::Celsius.suffix(), "°C");
        assert_eq!(TemperatureUnits::Fahrenheit.suffix(), "°F");
        assert_eq!(TemperatureUnits::Kelvin.suffix(), "");
    }

    #[test]
    fn test_raw_suffixes() {
        assert_eq!(units_suffix(0), "°C");
        assert_eq!(units_suffix(1), "°F");
        assert_eq!(units_suffix(2), "");
        assert_eq!(units_suffix(7), "");
        assert_eq!(units_suffix(-1), "");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("F".parse::<TemperatureUnits>(), Ok(TemperatureUnits::Fahrenheit));
        assert_eq!(" Kelvin ".parse::<TemperatureUnits>(), Ok(TemperatureUnits::Kelvin));
        assert!("rankine".parse::<TemperatureUnits>().is_err());
        assert_eq!(TemperatureUnits::parse_or_default("rankine"), TemperatureUnits::Celsius);
    }

    #[test]
    fn test_from_celsius() {
        assert_eq!(TemperatureUnits::Celsius.from_celsius(42.5), 42.5);
        assert_eq!(TemperatureUnits::Fahrenheit.from_celsius(100.0), 212.0);
        assert!((TemperatureUnits::Kelvin.from_celsius(0.0) - 273.15).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_raw_units_are_logged() {
        let capture = captured();

        assert_eq!(units_suffix(42), "");
        assert_eq!(units_suffix(1), "°F");

        let records = capture.0.lock().unwrap();
        let warnings: Vec<_> = records
            .iter()
            .filter(|(_, message)| message.contains("temperature units 42"))
            .collect();
        assert_eq!(
            warnings,
            vec![&(Level::Warn, "Unable to convert temperature units 42 to string".to_string())]
        );
    }
}
