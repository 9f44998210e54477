pub mod sensor;
pub mod temperature;

pub use sensor::{Reading, Sensor, SensorError, SensorEvent, SensorKind, SubscriptionId};
pub use temperature::TemperatureUnits;
