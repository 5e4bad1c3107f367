pub mod detector;

pub use detector::{Sample, ShakeDetector, ShakeEvent, ShakeHandler};
