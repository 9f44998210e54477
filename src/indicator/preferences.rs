use crate::manager::SensorManager;
use log::debug;

/// Settings view listing every sensor the manager knows about.
///
/// Built once on first use and presented again on later openings.
#[derive(Debug, Default)]
pub struct PreferencesDialog {
    presented: usize,
}

impl PreferencesDialog {
    pub fn new() -> Self {
        debug!("Creating preferences dialog");
        Self::default()
    }

    pub fn times_presented(&self) -> usize {
        self.presented
    }

    pub fn present(&mut self, manager: &SensorManager) -> String {
        self.presented += 1;

        let mut out = format!("Units: {}\n", manager.units());
        if manager.is_empty() {
            out.push_str("No sensors found\n");
        }
        for (index, (sensor, enabled)) in manager.sensors().enumerate() {
            let state = if enabled { "[x]" } else { "[ ]" };
            out.push_str(&format!(
                "{} {}. {} ({}) {}",
                state,
                index + 1,
                sensor.label(),
                sensor.family(),
                sensor.path()
            ));
            // hwmon reports no range as zero
            if sensor.max() > sensor.min() {
                out.push_str(&format!(
                    " [{:.1}..{:.1}{}]",
                    sensor.min(),
                    sensor.max(),
                    sensor.units()
                ));
            }
            out.push('\n');
        }
        out
    }
}
