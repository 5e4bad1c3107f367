use rand::Rng;
use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{BackendError, SensorBackend};
use crate::config::SimulatorConfig;
use crate::processing::detector::{Sample, ShakeDetector, ShakeEvent};

// -----------------------------------------------------------------------------
// SIMULATED SENSOR SOURCE
// -----------------------------------------------------------------------------

/// Scripted accelerometer source. The underlying simulator accepts a single
/// registration: at most one backend may be bound at a time, claimed at
/// `start()` and released at `stop()`.
pub struct Simulator {
    script: Vec<Sample>,
    bound: bool,
}

impl Simulator {
    pub fn new(script: Vec<Sample>) -> Self {
        Self {
            script,
            bound: false,
        }
    }

    pub fn shared(script: Vec<Sample>) -> Arc<Mutex<Simulator>> {
        Arc::new(Mutex::new(Self::new(script)))
    }

    /// Load a script from a CSV file with columns `timestamp_ms,x,y,z`.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut rdr = csv::Reader::from_reader(File::open(path)?);
        let mut script = Vec::new();

        for result in rdr.records() {
            let record = result?;
            if record.len() < 4 {
                return Err(
                    format!("script row has {} columns, expected 4", record.len()).into(),
                );
            }
            script.push(Sample::new(
                record[0].trim().parse()?,
                record[1].trim().parse()?,
                record[2].trim().parse()?,
                record[3].trim().parse()?,
            ));
        }

        Ok(Self::new(script))
    }

    /// Generate a synthetic script: stretches of rest noise with `bursts`
    /// shake bursts injected. Each burst alternates the summed-axis amplitude
    /// back and forth so every burst sample reads as one jolt.
    pub fn synthetic(config: &SimulatorConfig, bursts: u32, rest_samples_per_gap: u32) -> Self {
        let mut rng = rand::thread_rng();
        let mut script = Vec::new();
        let mut t = 0u64;
        let mut swing_up = true;

        for _ in 0..bursts {
            for _ in 0..rest_samples_per_gap {
                script.push(Sample::new(
                    t,
                    rng.gen_range(-config.rest_noise..config.rest_noise),
                    rng.gen_range(-config.rest_noise..config.rest_noise),
                    rng.gen_range(-config.rest_noise..config.rest_noise),
                ));
                t += config.sample_interval_ms;
            }
            for _ in 0..config.burst_jolts {
                // Advance before pushing so the first jolt clears the rate
                // gate even right after a dense rest stretch.
                t += config.burst_interval_ms;
                let x = if swing_up { config.burst_amplitude } else { 0.0 };
                swing_up = !swing_up;
                script.push(Sample::new(
                    t,
                    x,
                    rng.gen_range(-config.rest_noise..config.rest_noise),
                    rng.gen_range(-config.rest_noise..config.rest_noise),
                ));
            }
            // Keep timestamps strictly increasing into the next rest stretch.
            t += config.sample_interval_ms;
        }

        Self::new(script)
    }

    pub fn script(&self) -> &[Sample] {
        &self.script
    }
}

// -----------------------------------------------------------------------------
// SIMULATOR BACKEND
// -----------------------------------------------------------------------------

/// Adapter binding a detector to a shared simulator. Delivery is synchronous:
/// `replay` pushes the whole script through the detector on the caller's
/// thread, one `process_sample` call at a time.
pub struct SimulatorBackend {
    simulator: Arc<Mutex<Simulator>>,
    detector: Arc<Mutex<ShakeDetector>>,
    started: bool,
}

impl SimulatorBackend {
    pub fn new(simulator: Arc<Mutex<Simulator>>, detector: Arc<Mutex<ShakeDetector>>) -> Self {
        Self {
            simulator,
            detector,
            started: false,
        }
    }

    /// Deliver the full script to the detector, returning the shakes emitted
    /// during this replay. The registered handler fires along the way.
    pub fn replay(&mut self) -> Result<Vec<ShakeEvent>, BackendError> {
        if !self.started {
            return Err(BackendError::NotStarted);
        }
        let script = {
            let simulator = self.simulator.lock().unwrap();
            simulator.script.clone()
        };
        let mut detector = self.detector.lock().unwrap();
        Ok(script
            .iter()
            .filter_map(|sample| detector.process_sample(sample))
            .collect())
    }
}

impl SensorBackend for SimulatorBackend {
    fn start(&mut self) -> Result<(), BackendError> {
        if self.started {
            return Ok(());
        }
        let mut simulator = self.simulator.lock().unwrap();
        if simulator.bound {
            return Err(BackendError::AlreadyBound);
        }
        simulator.bound = true;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.simulator.lock().unwrap().bound = false;
        self.started = false;
    }
}

impl Drop for SimulatorBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShakeDetectorConfig;

    fn shared_detector() -> Arc<Mutex<ShakeDetector>> {
        Arc::new(Mutex::new(ShakeDetector::new(
            ShakeDetectorConfig::default(),
        )))
    }

    #[test]
    fn second_backend_cannot_bind_while_first_is_started() {
        let simulator = Simulator::shared(Vec::new());
        let mut first = SimulatorBackend::new(Arc::clone(&simulator), shared_detector());
        let mut second = SimulatorBackend::new(Arc::clone(&simulator), shared_detector());

        assert_eq!(first.start(), Ok(()));
        assert_eq!(second.start(), Err(BackendError::AlreadyBound));

        first.stop();
        assert_eq!(second.start(), Ok(()));
    }

    #[test]
    fn start_is_idempotent_for_the_bound_backend() {
        let simulator = Simulator::shared(Vec::new());
        let mut backend = SimulatorBackend::new(simulator, shared_detector());
        assert_eq!(backend.start(), Ok(()));
        assert_eq!(backend.start(), Ok(()));
        backend.stop();
        backend.stop();
    }

    #[test]
    fn dropping_a_started_backend_releases_the_binding() {
        let simulator = Simulator::shared(Vec::new());
        {
            let mut backend = SimulatorBackend::new(Arc::clone(&simulator), shared_detector());
            backend.start().unwrap();
        }
        assert!(!simulator.lock().unwrap().bound);
    }

    #[test]
    fn replay_requires_start() {
        let simulator = Simulator::shared(Vec::new());
        let mut backend = SimulatorBackend::new(simulator, shared_detector());
        assert_eq!(backend.replay(), Err(BackendError::NotStarted));
    }

    #[test]
    fn synthetic_script_has_monotonic_timestamps() {
        let simulator = Simulator::synthetic(&SimulatorConfig::default(), 3, 50);
        let script = simulator.script();
        assert!(!script.is_empty());
        for pair in script.windows(2) {
            assert!(pair[0].timestamp_ms < pair[1].timestamp_ms);
        }
    }
}
