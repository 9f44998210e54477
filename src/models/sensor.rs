use crate::models::temperature::TemperatureUnits;
use log::{debug, warn};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid reading '{raw}' from {path}")]
    InvalidValue { path: String, raw: String },

    #[error("sensor {0} is no longer present")]
    Vanished(String),
}

/// Snapshot of the displayable state of a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub path: String,
    pub label: String,
    pub value: f64,
    pub units: String,
}

impl Reading {
    /// `"<label>: <value to one decimal><units>"`, e.g. `CPU: 42.4°C`.
    pub fn display_text(&self) -> String {
        format!("{}: {:.1}{}", self.label, self.value, self.units)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    ValueChanged(Reading),
    LabelChanged(Reading),
    Error { path: String, error: SensorError },
}

impl SensorEvent {
    pub fn path(&self) -> &str {
        match self {
            SensorEvent::ValueChanged(reading) | SensorEvent::LabelChanged(reading) => {
                &reading.path
            }
            SensorEvent::Error { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Called with the id of the subscription it was registered under.
pub type SensorCallback = Box<dyn Fn(SubscriptionId, &SensorEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Temperature(TemperatureUnits),
    Generic,
}

pub struct Sensor {
    path: String,
    family: String,
    label: String,
    value: f64,
    units: String,
    min: f64,
    max: f64,
    kind: SensorKind,
    subscribers: Vec<(SubscriptionId, SensorCallback)>,
    next_subscription: u64,
}

impl Sensor {
    pub fn new(path: &str, family: &str, label: &str, units: &str) -> Self {
        Self {
            path: path.to_string(),
            family: family.to_string(),
            label: label.to_string(),
            value: 0.0,
            units: units.to_string(),
            min: 0.0,
            max: 0.0,
            kind: SensorKind::Generic,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// A temperature sensor reporting in Celsius.
    pub fn temperature(path: &str, family: &str, label: &str) -> Self {
        Self::temperature_full(path, family, label, 0.0, 0.0)
    }

    pub fn temperature_full(path: &str, family: &str, label: &str, min: f64, max: f64) -> Self {
        let units = TemperatureUnits::Celsius;
        Self {
            min,
            max,
            kind: SensorKind::Temperature(units),
            ..Self::new(path, family, label, units.suffix())
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Units the raw measurement should be converted into, if this is a temperature sensor.
    pub fn temperature_units(&self) -> Option<TemperatureUnits> {
        match self.kind {
            SensorKind::Temperature(units) => Some(units),
            SensorKind::Generic => None,
        }
    }

    pub fn reading(&self) -> Reading {
        Reading {
            path: self.path.clone(),
            label: self.label.clone(),
            value: self.value,
            units: self.units.clone(),
        }
    }

    pub fn subscribe(&mut self, callback: SensorCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, callback));
        id
    }

    /// Returns false if the subscription was not registered on this sensor.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        before != self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Store a new value, notifying subscribers only if it changed.
    pub fn set_value(&mut self, value: f64) {
        if self.value == value {
            return;
        }
        self.value = value;
        let event = SensorEvent::ValueChanged(self.reading());
        self.notify(&event);
    }

    pub fn set_label(&mut self, label: &str) {
        if self.label == label {
            return;
        }
        self.label = label.to_string();
        let event = SensorEvent::LabelChanged(self.reading());
        self.notify(&event);
    }

    /// Change the display units of a temperature sensor.
    ///
    /// Only the suffix changes here. Subscribers are not notified and the stored
    /// value is not converted; the next acquired value is reported in the new units.
    pub fn set_units(&mut self, units: TemperatureUnits) {
        match self.kind {
            SensorKind::Temperature(_) => {
                self.kind = SensorKind::Temperature(units);
                self.units = units.suffix().to_string();
            }
            SensorKind::Generic => {
                warn!("Sensor {} is not a temperature sensor, ignoring units {}", self.path, units);
            }
        }
    }

    pub fn report_error(&self, error: SensorError) {
        debug!("Sensor {} reporting error: {}", self.path, error);
        let event = SensorEvent::Error {
            path: self.path.clone(),
            error,
        };
        self.notify(&event);
    }

    fn notify(&self, event: &SensorEvent) {
        for (id, callback) in &self.subscribers {
            callback(*id, event);
        }
    }
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("path", &self.path)
            .field("family", &self.family)
            .field("label", &self.label)
            .field("value", &self.value)
            .field("units", &self.units)
            .field("kind", &self.kind)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
