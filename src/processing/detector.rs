use crate::config::{FirstSamplePolicy, ShakeDetectorConfig};
use crate::utils::log::log_csv;

// -----------------------------------------------------------------------------
// SAMPLE + EVENT TYPES
// -----------------------------------------------------------------------------

/// One accelerometer reading. Timestamps are monotonic milliseconds and must
/// be non-decreasing across the stream fed to a detector; that is the sample
/// source's responsibility, the detector never reorders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp_ms: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn new(timestamp_ms: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            z,
        }
    }

    fn axis_sum(&self) -> f64 {
        self.x + self.y + self.z
    }
}

/// A shake was registered at the given stream time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShakeEvent {
    pub timestamp_ms: u64,
}

/// Single-slot shake handler, invoked synchronously on the delivery thread.
pub type ShakeHandler = Box<dyn FnMut(ShakeEvent) + Send>;

// -----------------------------------------------------------------------------
// DETECTOR COMPONENT
// -----------------------------------------------------------------------------

/// Timing state owned exclusively by the detector. `None` values mean
/// "infinitely long ago" in the timeout comparisons below.
struct DetectorState {
    last_sample: Option<Sample>,
    last_jolt_ms: Option<u64>,
    last_shake_ms: Option<u64>,
    jolt_count: u32,
}

impl DetectorState {
    fn new() -> Self {
        Self {
            last_sample: None,
            last_jolt_ms: None,
            last_shake_ms: None,
            jolt_count: 0,
        }
    }
}

/// Classifies a stream of timestamped 3-axis samples into discrete shake
/// events: the force threshold suppresses noise, the time threshold bounds the
/// effective sampling rate, the timeout window expires stale jolts and the
/// shake duration cools down event flooding.
///
/// A "jolt" is one sample-to-sample transition whose scaled speed exceeds
/// `force_threshold`; a "shake" is emitted once `jolt_count` jolts accumulate
/// within a non-expired window and the cooldown since the last shake has
/// elapsed.
pub struct ShakeDetector {
    config: ShakeDetectorConfig,
    state: DetectorState,
    on_shake: Option<ShakeHandler>,
    trace: bool,
}

impl ShakeDetector {
    pub fn new(config: ShakeDetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::new(),
            on_shake: None,
            trace: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ShakeDetectorConfig::default())
    }

    /// Register the shake handler. Only one handler is held at a time;
    /// registering again replaces the previous one.
    pub fn set_on_shake<F>(&mut self, handler: F)
    where
        F: FnMut(ShakeEvent) + Send + 'static,
    {
        self.on_shake = Some(Box::new(handler));
    }

    pub fn clear_on_shake(&mut self) {
        self.on_shake = None;
    }

    /// Write a per-sample CSV trace under logs/ while processing.
    pub fn set_debug_logging(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    // Threshold changes take effect on the next processed sample; nothing is
    // reclassified retroactively.

    pub fn set_force_threshold(&mut self, force_threshold: f64) {
        self.config.force_threshold = force_threshold;
    }

    pub fn set_time_threshold_ms(&mut self, time_threshold_ms: u64) {
        self.config.time_threshold_ms = time_threshold_ms;
    }

    pub fn set_shake_timeout_ms(&mut self, shake_timeout_ms: u64) {
        self.config.shake_timeout_ms = shake_timeout_ms;
    }

    pub fn set_shake_duration_ms(&mut self, shake_duration_ms: u64) {
        self.config.shake_duration_ms = shake_duration_ms;
    }

    pub fn set_jolt_count(&mut self, jolt_count: u32) {
        self.config.jolt_count = jolt_count;
    }

    pub fn config(&self) -> &ShakeDetectorConfig {
        &self.config
    }

    /// Jolts accumulated in the current window.
    pub fn jolt_count(&self) -> u32 {
        self.state.jolt_count
    }

    /// The most recently accepted sample, untouched by rate-gated deliveries.
    pub fn last_sample(&self) -> Option<Sample> {
        self.state.last_sample
    }

    /// Run one sample through the state machine. Synchronous, never blocks,
    /// emits at most one event per call; the registered handler (if any) is
    /// invoked before this returns.
    pub fn process_sample(&mut self, sample: &Sample) -> Option<ShakeEvent> {
        let now = sample.timestamp_ms;

        // Expire the jolt window once it has gone stale. Saturating arithmetic
        // keeps a non-monotonic feed misclassified rather than panicking.
        if let Some(last_jolt) = self.state.last_jolt_ms {
            if now.saturating_sub(last_jolt) > self.config.shake_timeout_ms {
                self.state.jolt_count = 0;
            }
        }

        // Rate gate: samples arriving faster than the debounce interval are
        // dropped outright, with no state mutation at all.
        if let Some(last) = self.state.last_sample {
            if now.saturating_sub(last.timestamp_ms) <= self.config.time_threshold_ms {
                return None;
            }
        }

        // Prior point to diff against. With no accepted sample yet this is
        // policy-dependent: Immediate diffs against the rest sentinel,
        // Baseline skips classification until a baseline exists.
        let prior = match self.state.last_sample {
            Some(last) => Some((last.axis_sum(), now.saturating_sub(last.timestamp_ms))),
            None => match self.config.first_sample {
                FirstSamplePolicy::Immediate => Some((-3.0, now.max(1))),
                FirstSamplePolicy::Baseline => None,
            },
        };

        let mut fired = None;
        if let Some((prior_sum, dt_ms)) = prior {
            let speed = (sample.axis_sum() - prior_sum).abs() / dt_ms as f64 * 10000.0;
            if speed > self.config.force_threshold {
                // Jolts keep counting during the cooldown, saturating at the
                // threshold: only >= is ever tested and the counter resets on
                // emission or window expiry, so the bound changes nothing
                // observable.
                self.state.jolt_count = (self.state.jolt_count + 1).min(self.config.jolt_count);

                let cooled_down = match self.state.last_shake_ms {
                    Some(last_shake) => {
                        now.saturating_sub(last_shake) > self.config.shake_duration_ms
                    }
                    None => true,
                };
                if self.state.jolt_count >= self.config.jolt_count && cooled_down {
                    self.state.last_shake_ms = Some(now);
                    self.state.jolt_count = 0;
                    let event = ShakeEvent { timestamp_ms: now };
                    if let Some(handler) = self.on_shake.as_mut() {
                        handler(event);
                    }
                    fired = Some(event);
                }
                self.state.last_jolt_ms = Some(now);
            }
        }

        self.state.last_sample = Some(*sample);

        if self.trace {
            log_csv(
                "detector_trace.csv",
                &["timestamp_ms", "x", "y", "z", "jolt_count", "shake"],
                &[
                    &now.to_string(),
                    &sample.x.to_string(),
                    &sample.y.to_string(),
                    &sample.z.to_string(),
                    &self.state.jolt_count.to_string(),
                    if fired.is_some() { "1" } else { "0" },
                ],
            )
            .expect("Failed to write to log file");
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn sample(t: u64, sum: f64) -> Sample {
        Sample::new(t, sum, 0.0, 0.0)
    }

    fn detector(policy: FirstSamplePolicy) -> ShakeDetector {
        ShakeDetector::new(ShakeDetectorConfig {
            first_sample: policy,
            ..ShakeDetectorConfig::default()
        })
    }

    /// Qualifying stream: summed axes alternate 0 <-> 30, so every accepted
    /// transition clears the default force threshold even across the widest
    /// gap used below (|30| / 750 * 10000 = 400 > 300).
    fn alternating(times: &[u64]) -> Vec<Sample> {
        times
            .iter()
            .enumerate()
            .map(|(i, &t)| sample(t, if i % 2 == 0 { 30.0 } else { 0.0 }))
            .collect()
    }

    fn run(det: &mut ShakeDetector, samples: &[Sample]) -> Vec<u64> {
        samples
            .iter()
            .filter_map(|s| det.process_sample(s))
            .map(|e| e.timestamp_ms)
            .collect()
    }

    #[test]
    fn scenario_three_jolts_emit_one_shake() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        let events = run(&mut det, &alternating(&[0, 150, 300]));
        assert_eq!(events, vec![300]);
    }

    #[test]
    fn scenario_window_expiry_resets_counter_before_third_jolt() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        // Two jolts, then a qualifying sample 750ms after the second: the
        // window (500ms) has lapsed, so the counter restarts at one.
        let events = run(&mut det, &alternating(&[0, 150, 900]));
        assert!(events.is_empty());
        assert_eq!(det.jolt_count(), 1);
    }

    #[test]
    fn scenario_cooldown_suppresses_shake_650ms_after_previous() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        // First shake completes at t=300. Jolts at 650/800/950 refill the
        // counter, but 950 - 300 = 650 <= 700 so no second event fires.
        let events = run(&mut det, &alternating(&[0, 150, 300, 650, 800, 950]));
        assert_eq!(events, vec![300]);
        assert_eq!(det.jolt_count(), 3);
    }

    #[test]
    fn piled_up_jolts_fire_on_first_jolt_after_cooldown() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        let mut samples = alternating(&[0, 150, 300, 650, 800, 950]);
        // 1100 - 300 = 800 > 700: the next qualifying jolt may emit.
        samples.push(sample(1100, if samples.len() % 2 == 0 { 30.0 } else { 0.0 }));
        let events = run(&mut det, &samples);
        assert_eq!(events, vec![300, 1100]);
    }

    #[test]
    fn cooldown_expiry_alone_never_fires_retroactively() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        let mut events = run(&mut det, &alternating(&[0, 150, 300, 650, 800, 950]));
        assert_eq!(events, vec![300]);
        // Quiet samples long past the cooldown: identical axis sums, so no
        // jolt, so no emission even though the counter sits at threshold.
        let resting = det.last_sample().unwrap().x;
        events.extend(run(
            &mut det,
            &[sample(1200, resting), sample(1400, resting)],
        ));
        assert_eq!(events, vec![300]);
    }

    #[test]
    fn scenario_rate_gate_ignores_sample_entirely() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        det.process_sample(&sample(0, 10.0));
        let before = det.jolt_count();
        // 50ms after the accepted sample with time_threshold=100: dropped.
        assert_eq!(det.process_sample(&sample(50, 500.0)), None);
        assert_eq!(det.jolt_count(), before);
        assert_eq!(det.last_sample().unwrap().timestamp_ms, 0);
        assert_eq!(det.last_sample().unwrap().x, 10.0);
    }

    #[test]
    fn rate_gate_boundary_is_inclusive() {
        let mut det = detector(FirstSamplePolicy::Baseline);
        det.process_sample(&sample(0, 0.0));
        // Exactly time_threshold apart does not qualify for comparison.
        assert_eq!(det.process_sample(&sample(100, 50.0)), None);
        assert_eq!(det.last_sample().unwrap().timestamp_ms, 0);
    }

    #[test]
    fn force_threshold_boundary_is_exclusive() {
        let mut det = ShakeDetector::new(ShakeDetectorConfig {
            force_threshold: 312.5,
            jolt_count: 1,
            first_sample: FirstSamplePolicy::Baseline,
            ..ShakeDetectorConfig::default()
        });
        det.process_sample(&sample(0, 0.0));
        // dt=128, delta=4.0: speed is exactly 312.5, which must not qualify.
        assert_eq!(det.process_sample(&sample(128, 4.0)), None);
        assert_eq!(det.jolt_count(), 0);
        // delta=8.0 over the same dt gives 625: qualifies.
        assert!(det.process_sample(&sample(256, 12.0)).is_some());
    }

    #[test]
    fn no_two_events_closer_than_shake_duration() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        let times: Vec<u64> = (0..40).map(|i| i * 150).collect();
        let events = run(&mut det, &alternating(&times));
        assert!(events.len() >= 2);
        for pair in events.windows(2) {
            assert!(pair[1] - pair[0] > 700, "events too close: {:?}", pair);
        }
    }

    #[test]
    fn jolt_counter_never_exceeds_configured_count() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        // Continuous jolts during the cooldown after the first shake.
        for s in alternating(&[0, 150, 300, 450, 600, 750, 900]) {
            det.process_sample(&s);
            assert!(det.jolt_count() <= det.config().jolt_count);
        }
    }

    #[test]
    fn raising_jolt_count_never_increases_events() {
        let times: Vec<u64> = (0..20).map(|i| i * 150).collect();
        let stream = alternating(&times);
        let mut counts = Vec::new();
        for jolt_count in [2u32, 3, 4] {
            let mut det = ShakeDetector::new(ShakeDetectorConfig {
                jolt_count,
                ..ShakeDetectorConfig::default()
            });
            counts.push(run(&mut det, &stream).len());
        }
        assert!(counts[0] >= counts[1]);
        assert!(counts[1] >= counts[2]);
    }

    #[test]
    fn immediate_policy_classifies_first_sample_against_sentinel() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        // Even a rest reading diffs against (-1,-1,-1) over dt=1 and counts
        // as a jolt. This policy trades a spurious startup jolt for
        // responsiveness from the very first reading.
        det.process_sample(&sample(0, 0.0));
        assert_eq!(det.jolt_count(), 1);
    }

    #[test]
    fn baseline_policy_first_sample_only_seeds_state() {
        let mut det = detector(FirstSamplePolicy::Baseline);
        det.process_sample(&sample(0, 500.0));
        assert_eq!(det.jolt_count(), 0);
        assert_eq!(det.last_sample().unwrap().timestamp_ms, 0);
        // Classification starts on the second accepted sample.
        det.process_sample(&sample(150, 490.0));
        assert_eq!(det.jolt_count(), 1);
    }

    #[test]
    fn baseline_policy_needs_three_full_transitions() {
        let mut det = detector(FirstSamplePolicy::Baseline);
        // Same stream as the three-jolt scenario yields only two transitions.
        assert!(run(&mut det, &alternating(&[0, 150, 300])).is_empty());
        // One more qualifying transition completes the shake.
        assert_eq!(run(&mut det, &[sample(450, 10.0)]), vec![450]);
    }

    #[test]
    fn threshold_changes_apply_on_next_sample() {
        let mut det = detector(FirstSamplePolicy::Baseline);
        det.process_sample(&sample(0, 0.0));
        det.process_sample(&sample(150, 10.0));
        assert_eq!(det.jolt_count(), 1);
        // Raise the force threshold past the stream's speed: jolts stop.
        det.set_force_threshold(1000.0);
        det.process_sample(&sample(300, 0.0));
        assert_eq!(det.jolt_count(), 1);
    }

    #[test]
    fn handler_registration_is_last_write_wins() {
        let first_hits = Arc::new(Mutex::new(0u32));
        let second_hits = Arc::new(Mutex::new(Vec::new()));

        let mut det = detector(FirstSamplePolicy::Immediate);
        let first = Arc::clone(&first_hits);
        det.set_on_shake(move |_| *first.lock().unwrap() += 1);
        let second = Arc::clone(&second_hits);
        det.set_on_shake(move |e| second.lock().unwrap().push(e.timestamp_ms));

        run(&mut det, &alternating(&[0, 150, 300]));
        assert_eq!(*first_hits.lock().unwrap(), 0);
        assert_eq!(*second_hits.lock().unwrap(), vec![300]);
    }

    #[test]
    fn events_flow_without_a_registered_handler() {
        let mut det = detector(FirstSamplePolicy::Immediate);
        det.set_on_shake(|_| {});
        det.clear_on_shake();
        assert_eq!(run(&mut det, &alternating(&[0, 150, 300])), vec![300]);
    }
}
