// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub detector: ShakeDetectorConfig,
    pub simulator: SimulatorConfig,
    pub logging: LoggingConfig,
}

/// Thresholds governing how a stream of accelerometer samples is classified
/// into discrete shake events. All time values are in milliseconds and are
/// compared against sample timestamps, never wall-clock waits.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ShakeDetectorConfig {
    /// Minimum scaled speed for one jolt, in m/s * 100 (400 means 4 m/s).
    pub force_threshold: f64,
    /// Minimum elapsed time between two compared samples; faster samples are
    /// dropped outright.
    pub time_threshold_ms: u64,
    /// Maximum elapsed time since the last jolt before the counter resets.
    pub shake_timeout_ms: u64,
    /// Minimum spacing between two emitted shake events.
    pub shake_duration_ms: u64,
    /// Number of jolts required within the window to register a shake.
    pub jolt_count: u32,
    /// How the very first sample of the stream is classified.
    pub first_sample: FirstSamplePolicy,
}

/// Before any sample has been accepted there is nothing to diff against.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FirstSamplePolicy {
    /// Diff the first sample against a rest sentinel (x=y=z=-1). A violent
    /// first sample counts as a jolt right away.
    Immediate,
    /// The first sample only seeds the baseline; classification starts on the
    /// second accepted sample.
    Baseline,
}

impl Default for ShakeDetectorConfig {
    fn default() -> Self {
        Self {
            force_threshold: 300.0,
            time_threshold_ms: 100,
            shake_timeout_ms: 500,
            shake_duration_ms: 700,
            jolt_count: 3,
            first_sample: FirstSamplePolicy::Immediate,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimulatorConfig {
    /// Spacing of rest samples in a synthetic script (~50Hz by default).
    pub sample_interval_ms: u64,
    /// Spacing of the jolt samples inside a shake burst.
    pub burst_interval_ms: u64,
    /// Peak summed-axis amplitude of a burst jolt.
    pub burst_amplitude: f64,
    /// Jolts per shake burst.
    pub burst_jolts: u32,
    /// Uniform noise range applied to rest samples.
    pub rest_noise: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 20,
            burst_interval_ms: 150,
            burst_amplitude: 12.0,
            burst_jolts: 4,
            rest_noise: 0.05,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub enable_debug_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            enable_debug_logging: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detector: ShakeDetectorConfig::default(),
            simulator: SimulatorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, String> {
    let config_str =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_yaml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {}", e))
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), String> {
    let yaml =
        serde_yaml::to_string(config).map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, yaml).map_err(|e| format!("Failed to write config file: {}", e))
}
