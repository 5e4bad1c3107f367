use thiserror::Error;

use crate::processing::detector::Sample;

pub mod device;
pub mod simulator;

pub use device::DeviceBackend;
pub use simulator::{Simulator, SimulatorBackend};

// -----------------------------------------------------------------------------
// BACKEND CONTRACT
// -----------------------------------------------------------------------------

/// Sensor types a device may report. Backends forward accelerometer readings
/// only; everything else is filtered before it reaches the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
    Orientation,
}

/// One raw reading as delivered by a device sensor service.
#[derive(Debug, Clone, Copy)]
pub struct RawReading {
    pub kind: SensorKind,
    pub sample: Sample,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// No sensor service behind this backend.
    #[error("sensor service unavailable")]
    SensorUnavailable,
    /// A sensor service exists but exposes no accelerometer.
    #[error("no accelerometer available")]
    UnsupportedSensor,
    /// The simulator already has a bound backend; only one may be active.
    #[error("a backend is already bound to this simulator")]
    AlreadyBound,
    /// Samples were requested before `start()` succeeded.
    #[error("backend not started")]
    NotStarted,
}

/// Lifecycle contract shared by the device and simulator adapters. Both
/// methods are idempotent: a started backend starts cleanly again, a stopped
/// backend stops cleanly again.
pub trait SensorBackend {
    fn start(&mut self) -> Result<(), BackendError>;
    fn stop(&mut self);
}
