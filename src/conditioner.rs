//! Inclinometer signal conditioning.
//!
//! This module turns raw accelerometer samples into a stable tilt-angle
//! estimate through a fixed chain:
//! - Gravity estimation via incremental low-pass filtering
//! - Tilt angle from the filtered (x, y) pair
//! - Median-of-3 despiking over a bounded history
//! - Single-sample outlier rejection
//! - Zero-offset calibration
//!
//! Design note: all stages are incremental, O(1) per sample, with a fixed
//! three-entry history as the only buffer. No allocations in the hot path.
//!
//! Numeric failures are prevented at the source: non-finite input components
//! are sanitized and the normalization denominator is floored, so the
//! conditioned angle is never NaN.

use crate::types::AccelSample;

/// Parameters for the signal-conditioning chain.
///
/// Defaults are tuned for handheld phone accelerometers at the usual
/// ~50 Hz delivery rate.
#[derive(Debug, Clone)]
pub struct ConditionerConfig {
    /// Low-pass coefficient for gravity estimation, applied as
    /// `filtered = alpha * filtered + (1 - alpha) * raw`.
    /// Range: [0.0, 1.0]. Larger = slower response, more noise rejection.
    pub gravity_alpha: f32,

    /// Floor for the (x, y) normalization denominator. Guards against
    /// division by a near-zero gravity projection.
    pub norm_floor: f32,

    /// Maximum jump (degrees) between consecutive accepted angles.
    /// A candidate further than this from the last accepted angle is
    /// withheld for one call.
    pub outlier_threshold_deg: f32,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            gravity_alpha: 0.84,
            norm_floor: 1e-6,
            outlier_threshold_deg: 20.0,
        }
    }
}

/// Length of the despiking history. Median-of-3 removes single-sample
/// spikes with one sample of latency.
const DESPIKE_LEN: usize = 3;

/// Turns raw acceleration samples into a conditioned tilt angle.
///
/// State is mutated only from `ingest` and `calibrate`; the caller is
/// expected to serialize those calls (single sensor-callback context).
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    config: ConditionerConfig,

    /// Low-pass-filtered gravity vector [x, y, z].
    gravity: [f32; 3],

    /// True until the first sample seeds the gravity filter.
    seeded: bool,

    /// History of the last raw angles, oldest first. Never exceeds
    /// `DESPIKE_LEN` entries.
    history: [f32; DESPIKE_LEN],
    history_len: usize,

    /// Most recent raw (pre-offset) angle, used as the calibration anchor.
    last_raw_deg: f32,

    /// Last accepted despiked angle, reference for outlier rejection.
    last_accepted_deg: Option<f32>,

    /// Calibration offset subtracted from every accepted angle.
    zero_offset_deg: f32,

    /// Samples processed (diagnostics).
    sample_count: u64,
}

impl SignalConditioner {
    /// Creates a conditioner with the given configuration and a previously
    /// persisted zero offset (0.0 for a fresh installation).
    pub fn new(config: ConditionerConfig, zero_offset_deg: f32) -> Self {
        Self {
            config,
            gravity: [0.0; 3],
            seeded: false,
            history: [0.0; DESPIKE_LEN],
            history_len: 0,
            last_raw_deg: 0.0,
            last_accepted_deg: None,
            zero_offset_deg,
            sample_count: 0,
        }
    }

    /// Ingests one accelerometer sample.
    ///
    /// Returns the conditioned angle in degrees, or `None` when the sample
    /// was withheld by outlier rejection. A withheld sample still updates
    /// the rejection reference, so the next in-range sample is accepted
    /// normally.
    pub fn ingest(&mut self, sample: &AccelSample) -> Option<f32> {
        let ax = finite_or_zero(sample.x);
        let ay = finite_or_zero(sample.y);
        let az = finite_or_zero(sample.z);

        if !self.seeded {
            // First sample seeds the filter directly; no warm-up transient.
            self.gravity = [ax, ay, az];
            self.seeded = true;
        } else {
            let alpha = self.config.gravity_alpha;
            self.gravity[0] = alpha * self.gravity[0] + (1.0 - alpha) * ax;
            self.gravity[1] = alpha * self.gravity[1] + (1.0 - alpha) * ay;
            self.gravity[2] = alpha * self.gravity[2] + (1.0 - alpha) * az;
        }
        self.sample_count += 1;

        let raw = self.raw_angle_from_gravity();
        self.last_raw_deg = raw;
        self.push_history(raw);

        let candidate = self.median();

        match self.last_accepted_deg {
            Some(prev) if (candidate - prev).abs() > self.config.outlier_threshold_deg => {
                // Track the wild value so the comparison window moves with
                // it, but withhold it from the output for this call.
                self.last_accepted_deg = Some(candidate);
                None
            }
            _ => {
                self.last_accepted_deg = Some(candidate);
                Some(candidate - self.zero_offset_deg)
            }
        }
    }

    /// Sets the zero offset to the current raw angle so the present
    /// orientation reads as 0°.
    ///
    /// The despiking history is refilled with the anchor angle to avoid a
    /// transient median jump on the next few samples. Returns the new
    /// offset for persistence; the caller coordinates the coupled display
    /// reset and freeze window.
    pub fn calibrate(&mut self) -> f32 {
        let anchor = self.last_raw_deg;
        self.zero_offset_deg = anchor;
        self.history = [anchor; DESPIKE_LEN];
        self.history_len = DESPIKE_LEN;
        self.last_accepted_deg = Some(anchor);
        anchor
    }

    /// The zero offset currently in effect (degrees).
    pub fn zero_offset(&self) -> f32 {
        self.zero_offset_deg
    }

    /// Most recent raw (pre-offset) angle in degrees.
    pub fn raw_angle(&self) -> f32 {
        self.last_raw_deg
    }

    /// Current gravity estimate [x, y, z].
    pub fn gravity(&self) -> [f32; 3] {
        self.gravity
    }

    /// Number of samples processed.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    fn raw_angle_from_gravity(&self) -> f32 {
        let gx = self.gravity[0];
        let gy = self.gravity[1];
        let norm = (gx * gx + gy * gy).sqrt().max(self.config.norm_floor);
        let nx = gx / norm;
        let ny = gy / norm;
        ny.atan2(nx).to_degrees()
    }

    fn push_history(&mut self, angle: f32) {
        if self.history_len < DESPIKE_LEN {
            self.history[self.history_len] = angle;
            self.history_len += 1;
        } else {
            // Evict oldest.
            self.history[0] = self.history[1];
            self.history[1] = self.history[2];
            self.history[2] = angle;
        }
    }

    /// Median of the current history. During warm-up (fewer than three
    /// entries) this is the middle of the sorted partial history.
    fn median(&self) -> f32 {
        let mut sorted = [0.0f32; DESPIKE_LEN];
        sorted[..self.history_len].copy_from_slice(&self.history[..self.history_len]);
        let slice = &mut sorted[..self.history_len];
        slice.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        slice[self.history_len / 2]
    }
}

/// Replaces NaN/infinite components with 0.0 before they enter the filter.
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditioner() -> SignalConditioner {
        SignalConditioner::new(ConditionerConfig::default(), 0.0)
    }

    /// Feed the same acceleration repeatedly; returns the last output.
    fn settle(c: &mut SignalConditioner, x: f32, y: f32, n: usize) -> Option<f32> {
        let mut out = None;
        for i in 0..n {
            out = c.ingest(&AccelSample::new(i as u64 * 20, x, y, 0.0));
        }
        out
    }

    #[test]
    fn test_first_sample_seeds_filter() {
        let mut c = conditioner();
        c.ingest(&AccelSample::new(0, 0.0, 1.0, 0.0));
        let g = c.gravity();
        assert!((g[1] - 1.0).abs() < 1e-6, "first sample seeds directly");
    }

    #[test]
    fn test_level_device_reads_ninety() {
        // Gravity entirely on +y: atan2(1, 0) = 90°.
        let mut c = conditioner();
        let out = settle(&mut c, 0.0, 9.81, 10).unwrap();
        assert!((out - 90.0).abs() < 0.5, "got {out}");
    }

    #[test]
    fn test_tilt_angle_tracks_gravity_direction() {
        // Equal x/y components: 45°.
        let mut c = conditioner();
        let out = settle(&mut c, 6.94, 6.94, 30).unwrap();
        assert!((out - 45.0).abs() < 0.5, "got {out}");
    }

    #[test]
    fn test_despike_median_removes_single_spike() {
        let mut c = conditioner();
        settle(&mut c, 0.0, 9.81, 20);

        // One wild sample. A raw atan2 of the spiked vector would read 0°;
        // the gravity filter plus the median keep the conditioned angle in
        // the neighborhood of 90°.
        let spiked = c.ingest(&AccelSample::new(500, 9.81, 0.0, 0.0));
        if let Some(angle) = spiked {
            assert!((angle - 90.0).abs() < 12.0, "spike leaked: {angle}");
        }
        let after = c.ingest(&AccelSample::new(520, 0.0, 9.81, 0.0));
        if let Some(angle) = after {
            assert!((angle - 90.0).abs() < 12.0, "got {angle}");
        }
    }

    #[test]
    fn test_outlier_withheld_then_next_accepted() {
        let mut c = conditioner();
        settle(&mut c, 0.0, 9.81, 20);

        // Force the history to a far-away angle by refilling via calibrate
        // machinery would hide the effect; instead inject directly through
        // ingest with a persistent new direction. The first conditioned
        // candidate that jumps > 20° must be withheld.
        let mut saw_withheld = false;
        let mut last = None;
        for i in 0..10 {
            let out = c.ingest(&AccelSample::new(1000 + i * 20, 9.81, -9.81, 0.0));
            if out.is_none() {
                saw_withheld = true;
            } else {
                last = out;
            }
        }
        assert!(saw_withheld, "the jump from 90° to -45° must trip rejection");
        // After the reference catches up, outputs flow again.
        assert!(last.is_some());
    }

    #[test]
    fn test_calibration_zeroes_current_angle() {
        let mut c = conditioner();
        settle(&mut c, 0.0, 9.81, 20);

        let offset = c.calibrate();
        assert!((offset - 90.0).abs() < 0.5);

        // No further motion: output converges to 0 within the despike
        // warm-up (three samples).
        let mut out = 0.0;
        for i in 0..3 {
            if let Some(a) = c.ingest(&AccelSample::new(2000 + i * 20, 0.0, 9.81, 0.0)) {
                out = a;
            }
        }
        assert!(out.abs() < 0.5, "post-calibration angle {out}");
    }

    #[test]
    fn test_persisted_offset_applied_from_construction() {
        let mut c = SignalConditioner::new(ConditionerConfig::default(), 90.0);
        let out = settle(&mut c, 0.0, 9.81, 20).unwrap();
        assert!(out.abs() < 0.5, "stored offset should zero a level device");
    }

    #[test]
    fn test_nan_input_never_propagates() {
        let mut c = conditioner();
        settle(&mut c, 0.0, 9.81, 5);
        let out = c.ingest(&AccelSample::new(200, f32::NAN, f32::INFINITY, 0.0));
        if let Some(angle) = out {
            assert!(angle.is_finite());
        }
        // Subsequent healthy samples keep producing finite output.
        let out = settle(&mut c, 0.0, 9.81, 5);
        assert!(out.unwrap().is_finite());
    }

    #[test]
    fn test_degenerate_vector_is_well_defined() {
        let mut c = conditioner();
        for i in 0..10 {
            let out = c.ingest(&AccelSample::new(i * 20, 0.0, 0.0, 0.0));
            if let Some(angle) = out {
                assert!(angle.is_finite());
            }
        }
    }

    #[test]
    fn test_history_never_exceeds_three() {
        let mut c = conditioner();
        for i in 0..50 {
            c.ingest(&AccelSample::new(i * 20, 0.1 * i as f32, 9.81, 0.0));
            assert!(c.history_len <= DESPIKE_LEN);
        }
    }
}
