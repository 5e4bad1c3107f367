pub mod backends;
pub mod config;
pub mod processing;
pub mod utils;


pub use backends::{
    BackendError, DeviceBackend, RawReading, SensorBackend, SensorKind, Simulator,
    SimulatorBackend,
};
pub use config::{Config, FirstSamplePolicy, LoggingConfig, ShakeDetectorConfig, SimulatorConfig};
pub use processing::detector::{Sample, ShakeDetector, ShakeEvent};
