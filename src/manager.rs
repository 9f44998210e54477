use crate::collectors::hwmon::HwmonInput;
use crate::config::AppConfig;
use crate::models::{Sensor, TemperatureUnits};
use indexmap::IndexMap;
use log::{debug, info, warn};

/// Receives sensor lifecycle notifications from the [`SensorManager`].
///
/// The manager emits exactly one `sensor_enabled` per sensor before any other
/// event about it, and one `sensor_disabled` when it goes away.
pub trait ManagerListener {
    fn sensor_enabled(&mut self, sensor: &mut Sensor, position: usize);
    fn sensor_disabled(&mut self, sensor: &mut Sensor);
}

#[derive(Debug)]
struct ManagedSensor {
    sensor: Sensor,
    enabled: bool,
}

/// Owns every known sensor, in discovery order.
#[derive(Debug, Default)]
pub struct SensorManager {
    sensors: IndexMap<String, ManagedSensor>,
    units: TemperatureUnits,
    // lowercase label hint -> display label
    renames: IndexMap<String, String>,
    disabled: Vec<String>,
}

impl SensorManager {
    pub fn new(units: TemperatureUnits) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let renames = config
            .sensors
            .iter()
            .map(|(hint, label)| (hint.to_lowercase(), label.clone()))
            .collect();
        Self {
            renames,
            disabled: config.indicator.disabled_sensors(),
            ..Self::new(config.units())
        }
    }

    pub fn units(&self) -> TemperatureUnits {
        self.units
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn sensor(&self, path: &str) -> Option<&Sensor> {
        self.sensors.get(path).map(|managed| &managed.sensor)
    }

    pub fn sensor_mut(&mut self, path: &str) -> Option<&mut Sensor> {
        self.sensors.get_mut(path).map(|managed| &mut managed.sensor)
    }

    pub fn is_enabled(&self, path: &str) -> bool {
        self.sensors.get(path).is_some_and(|managed| managed.enabled)
    }

    /// All sensors with their enabled state, in manager order.
    pub fn sensors(&self) -> impl Iterator<Item = (&Sensor, bool)> {
        self.sensors
            .values()
            .map(|managed| (&managed.sensor, managed.enabled))
    }

    /// Path of the sensor at a zero based index in manager order.
    pub fn path_at(&self, index: usize) -> Option<&str> {
        self.sensors.get_index(index).map(|(path, _)| path.as_str())
    }

    /// Take ownership of `sensor`, announcing it if `enabled`.
    pub fn add(&mut self, sensor: Sensor, enabled: bool, listener: &mut dyn ManagerListener) {
        let path = sensor.path().to_string();
        if self.sensors.contains_key(&path) {
            warn!("Sensor {} is already managed", path);
            return;
        }
        debug!("Adding sensor {} ({})", path, sensor.label());
        self.sensors.insert(
            path.clone(),
            ManagedSensor {
                sensor,
                enabled: false,
            },
        );
        if enabled {
            self.enable(&path, listener);
        }
    }

    /// Returns false if the sensor is unknown or already enabled.
    pub fn enable(&mut self, path: &str, listener: &mut dyn ManagerListener) -> bool {
        let Some(index) = self.sensors.get_index_of(path) else {
            return false;
        };
        if self.sensors[index].enabled {
            return false;
        }
        let position = self.enabled_before(index);
        let managed = &mut self.sensors[index];
        managed.enabled = true;
        info!("Enabled sensor {}", path);
        listener.sensor_enabled(&mut managed.sensor, position);
        true
    }

    /// Returns false if the sensor is unknown or already disabled.
    pub fn disable(&mut self, path: &str, listener: &mut dyn ManagerListener) -> bool {
        let Some(managed) = self.sensors.get_mut(path) else {
            return false;
        };
        if !managed.enabled {
            return false;
        }
        managed.enabled = false;
        info!("Disabled sensor {}", path);
        listener.sensor_disabled(&mut managed.sensor);
        true
    }

    /// Disable and drop a sensor, handing it back to the caller.
    pub fn remove(&mut self, path: &str, listener: &mut dyn ManagerListener) -> Option<Sensor> {
        self.disable(path, listener);
        self.sensors
            .shift_remove(path)
            .map(|managed| managed.sensor)
    }

    /// Change the units of every temperature sensor.
    ///
    /// Values are reported in the new units from the next [`SensorManager::sync`].
    pub fn set_units(&mut self, units: TemperatureUnits) {
        info!("Switching temperature units to {}", units);
        self.units = units;
        for managed in self.sensors.values_mut() {
            if managed.sensor.temperature_units().is_some() {
                managed.sensor.set_units(units);
            }
        }
    }

    /// Reconcile the managed sensors with a fresh hwmon scan.
    pub fn sync(&mut self, inputs: Vec<HwmonInput>, listener: &mut dyn ManagerListener) {
        let vanished: Vec<String> = self
            .sensors
            .keys()
            .filter(|path| !inputs.iter().any(|input| &input.path == *path))
            .cloned()
            .collect();
        for path in vanished {
            info!("Sensor {} vanished", path);
            self.remove(&path, listener);
        }

        for input in inputs {
            match self.sensors.get_mut(&input.path) {
                Some(managed) => update(&mut managed.sensor, input),
                None => {
                    let enabled = !self.disabled.iter().any(|path| path == &input.path);
                    let sensor = self.create(input);
                    self.add(sensor, enabled, listener);
                }
            }
        }
    }

    fn create(&self, input: HwmonInput) -> Sensor {
        let label = self.display_label(&input);
        let mut sensor =
            Sensor::temperature_full(&input.path, &input.name, &label, input.min, input.max);
        sensor.set_units(self.units);
        update(&mut sensor, input);
        sensor
    }

    fn display_label(&self, input: &HwmonInput) -> String {
        let haystack = format!("{} {}", input.name, input.label).to_lowercase();
        self.renames
            .iter()
            .find(|(hint, _)| haystack.contains(hint.as_str()))
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| input.label.clone())
    }

    fn enabled_before(&self, index: usize) -> usize {
        self.sensors
            .values()
            .take(index)
            .filter(|managed| managed.enabled)
            .count()
    }
}

fn update(sensor: &mut Sensor, input: HwmonInput) {
    match input.celsius {
        Ok(celsius) => {
            let value = match sensor.temperature_units() {
                Some(units) => units.from_celsius(celsius),
                None => celsius,
            };
            sensor.set_value(value);
        }
        Err(error) => sensor.report_error(error),
    }
}
