//! Display smoothing with a critically damped spring.
//!
//! The conditioned angle still steps whenever a new sample lands; driving
//! the on-screen needle straight from it looks jittery. This module moves a
//! displayed angle toward the conditioned target with a second-order spring
//! at critical damping, so the needle glides without overshoot.
//!
//! Three guards shape the output:
//! - a zero-snap deadband so the needle rests at exactly 0° instead of
//!   hunting around it,
//! - a velocity clamp so a large target step never whips the needle,
//! - a short post-calibration freeze during which the output is pinned to
//!   0° while the conditioner re-anchors.

/// Tuning for the display spring.
#[derive(Debug, Clone)]
pub struct SmootherConfig {
    /// Spring natural frequency ω (rad/s). Damping is fixed at 2ω
    /// (critical damping, no overshoot).
    pub natural_freq: f32,

    /// Velocity clamp in degrees per second.
    pub max_velocity_deg_s: f32,

    /// Displayed-angle clamp; output stays within ±this (degrees).
    pub angle_limit_deg: f32,

    /// Targets with magnitude below this (degrees) are treated as exactly
    /// zero, and a settled needle inside this band snaps to 0.0.
    pub deadband_deg: f32,

    /// Post-calibration freeze duration (milliseconds, monotonic clock).
    pub freeze_ms: u64,

    /// Substitute tick interval (seconds) when dt is non-positive or
    /// implausibly large.
    pub nominal_dt_s: f32,

    /// dt values above this (seconds) are treated as scheduling jitter and
    /// replaced with the nominal interval.
    pub max_dt_s: f32,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            natural_freq: 6.0,
            max_velocity_deg_s: 240.0,
            angle_limit_deg: 30.0,
            deadband_deg: 0.25,
            freeze_ms: 100,
            nominal_dt_s: 0.016,
            max_dt_s: 0.1,
        }
    }
}

/// Drives the displayed angle toward a target and tracks the session peak.
#[derive(Debug, Clone)]
pub struct DisplaySmoother {
    config: SmootherConfig,

    /// Displayed angle (degrees), always within ±angle_limit.
    displayed: f32,

    /// Displayed angular velocity (degrees/s), always within ±max_velocity.
    velocity: f32,

    /// Largest |displayed| seen since the last reset, capped at the angle
    /// limit. Monotone within a session.
    peak: f32,

    /// Monotonic timestamp (ms) until which output is pinned to zero.
    freeze_until_ms: u64,
}

impl DisplaySmoother {
    pub fn new(config: SmootherConfig) -> Self {
        Self {
            config,
            displayed: 0.0,
            velocity: 0.0,
            peak: 0.0,
            freeze_until_ms: 0,
        }
    }

    /// Advances the spring by one frame tick.
    ///
    /// `target_deg` is the latest conditioned angle, `dt_s` the elapsed
    /// frame time, `now_ms` the monotonic clock used for the freeze window.
    /// Returns the new displayed angle.
    pub fn tick(&mut self, target_deg: f32, dt_s: f32, now_ms: u64) -> f32 {
        if now_ms < self.freeze_until_ms {
            // Calibration freeze: hold at zero, skip the spring entirely.
            self.displayed = 0.0;
            self.velocity = 0.0;
            return 0.0;
        }

        let dt = if dt_s <= 0.0 || dt_s > self.config.max_dt_s {
            self.config.nominal_dt_s
        } else {
            dt_s
        };

        let target = if target_deg.abs() < self.config.deadband_deg {
            0.0
        } else {
            target_deg
        };

        let omega = self.config.natural_freq;
        let damping = 2.0 * omega;

        let error = target - self.displayed;
        let accel = omega * omega * error - damping * self.velocity;

        self.velocity = (self.velocity + accel * dt)
            .clamp(-self.config.max_velocity_deg_s, self.config.max_velocity_deg_s);
        self.displayed = (self.displayed + self.velocity * dt)
            .clamp(-self.config.angle_limit_deg, self.config.angle_limit_deg);

        // Zero-snap: once the needle has settled inside the deadband with a
        // zero target, pin it to exactly 0.0 so it cannot hover at ±ε.
        if target == 0.0
            && self.displayed.abs() < self.config.deadband_deg
            && self.velocity.abs() < 1.0
        {
            self.displayed = 0.0;
            self.velocity = 0.0;
        }

        self.peak = self
            .peak
            .max(self.displayed.abs())
            .min(self.config.angle_limit_deg);

        self.displayed
    }

    /// Begins the post-calibration freeze window at `now_ms`.
    pub fn begin_freeze(&mut self, now_ms: u64) {
        self.freeze_until_ms = now_ms + self.config.freeze_ms;
    }

    /// Clears displayed angle, velocity, and peak. Used on calibration and
    /// on session restart.
    pub fn reset(&mut self) {
        self.displayed = 0.0;
        self.velocity = 0.0;
        self.peak = 0.0;
    }

    /// Current displayed angle (degrees).
    pub fn displayed(&self) -> f32 {
        self.displayed
    }

    /// Running peak of |displayed| since the last reset (degrees).
    pub fn peak(&self) -> f32 {
        self.peak
    }
}

impl Default for DisplaySmoother {
    fn default() -> Self {
        Self::new(SmootherConfig::default())
    }
}
