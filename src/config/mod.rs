use crate::collectors::hwmon::DEFAULT_HWMON_ROOT;
use crate::models::TemperatureUnits;
use anyhow::{Context, Result};
use config::{Config, File, FileFormat};
use indexmap::IndexMap;
use log::{debug, LevelFilter};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

fn default_polling() -> u64 {
    2
}

fn default_units() -> String {
    TemperatureUnits::Celsius.name().to_string()
}

fn default_hwmon_root() -> String {
    DEFAULT_HWMON_ROOT.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndicatorConfig {
    /// Seconds between hwmon scans.
    #[serde(default = "default_polling")]
    pub polling: u64,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_hwmon_root")]
    pub hwmon_root: String,
    /// Comma separated sensor paths that start disabled.
    #[serde(default)]
    pub disabled: String,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            polling: default_polling(),
            units: default_units(),
            hwmon_root: default_hwmon_root(),
            disabled: String::new(),
        }
    }
}

impl IndicatorConfig {
    pub fn disabled_sensors(&self) -> Vec<String> {
        self.disabled
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(String::from)
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(rename = "indicator", default)]
    pub indicator: IndicatorConfig,
    /// Label hint (case insensitive substring of `<driver> <label>`) to display label.
    #[serde(rename = "sensors", default)]
    pub sensors: IndexMap<String, String>,
    #[serde(rename = "logging", default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn get_log_level(&self) -> LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    pub fn units(&self) -> TemperatureUnits {
        TemperatureUnits::parse_or_default(&self.indicator.units)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.indicator.polling.max(1))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        debug!("Loading configuration from {}", config_path.display());

        let config = Config::builder()
            .add_source(File::from(config_path).format(FileFormat::Ini))
            .build()
            .context(format!("Failed to load config from {}", config_path.display()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize config")?;

        Ok(app_config)
    }
}
