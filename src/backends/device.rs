use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::{BackendError, RawReading, SensorBackend, SensorKind};
use crate::processing::detector::ShakeDetector;

const RECV_POLL: Duration = Duration::from_millis(50);

/// Hardware-style backend: drains a channel of kind-tagged readings on its own
/// thread and feeds the accelerometer ones into a shared detector. The mutex
/// around the detector is what serializes `process_sample` calls, since the
/// detector itself is not safe for concurrent mutation.
pub struct DeviceBackend {
    detector: Arc<Mutex<ShakeDetector>>,
    readings: Option<Arc<Mutex<Receiver<RawReading>>>>,
    kinds: Vec<SensorKind>,
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl DeviceBackend {
    /// `readings` is the device's sensor service: `None` models a device with
    /// no sensor service at all, `kinds` lists the sensors it exposes.
    pub fn new(
        detector: Arc<Mutex<ShakeDetector>>,
        readings: Option<Receiver<RawReading>>,
        kinds: Vec<SensorKind>,
    ) -> Self {
        Self {
            detector,
            readings: readings.map(|r| Arc::new(Mutex::new(r))),
            kinds,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl SensorBackend for DeviceBackend {
    fn start(&mut self) -> Result<(), BackendError> {
        // Don't register if already registered.
        if self.worker.is_some() {
            return Ok(());
        }
        let readings = match &self.readings {
            Some(readings) => Arc::clone(readings),
            None => return Err(BackendError::SensorUnavailable),
        };
        if !self.kinds.contains(&SensorKind::Accelerometer) {
            return Err(BackendError::UnsupportedSensor);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let detector = Arc::clone(&self.detector);
        self.worker = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let next = {
                    let rx = readings.lock().unwrap();
                    rx.recv_timeout(RECV_POLL)
                };
                match next {
                    Ok(reading) => {
                        if reading.kind == SensorKind::Accelerometer {
                            let mut detector = detector.lock().unwrap();
                            detector.process_sample(&reading.sample);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            // The worker wakes at least every RECV_POLL, so this is bounded.
            worker.join().expect("delivery thread panicked");
        }
    }
}

impl Drop for DeviceBackend {
    fn drop(&mut self) {
        self.stop();
    }
}
