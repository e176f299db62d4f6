//! End-to-end screening pipeline.
//!
//! This module wires the stages together and exposes the narrow interface
//! the surrounding app consumes: sample/frame ingestion, the frame-clock
//! tick, calibration, gating, and the multi-reading session.
//!
//! # Threading
//!
//! Sensor samples and landmark frames arrive on their producers' threads;
//! both are published into single-slot latest-value cells
//! ([`LatestSlot`]) with most-recent-wins semantics. The tick loop and
//! gate evaluation read those cells without ever blocking on a fresh
//! value. All remaining pipeline state is mutated only through `&mut self`
//! methods, which the caller invokes from one context.
//!
//! Calibration coordinates the conditioner offset, the display reset, the
//! freeze window, and persistence inside a single call, so no tick can
//! observe a half-calibrated pipeline.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::{info, warn};

use crate::conditioner::{ConditionerConfig, SignalConditioner};
use crate::gate::{GateConfig, GateEvent, GateStatus, PositionGate};
use crate::session::{MeasurementSession, RecordOutcome, SessionSnapshot};
use crate::smoother::{DisplaySmoother, SmootherConfig};
use crate::store::CalibrationStore;
use crate::types::{AccelSample, LandmarkFrame, ReadingPosition, ScreeningRecord};

/// A thread-safe single-slot handoff cell.
///
/// Writers overwrite the latest value; the reader takes it at its own
/// pace. No queueing, no backpressure beyond dropping stale values. Clone
/// handles freely; all clones share the slot.
#[derive(Debug, Default)]
pub struct LatestSlot<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for LatestSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    /// Stores a value, replacing any unconsumed predecessor.
    pub fn publish(&self, value: T) {
        // A poisoned lock means a writer panicked mid-store of an Option
        // swap, which cannot leave the slot torn; keep going.
        let mut slot = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(value);
    }

    /// Takes the latest value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        let mut slot = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.take()
    }
}

/// Bundled configuration for the whole pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub conditioner: ConditionerConfig,
    pub smoother: SmootherConfig,
    pub gate: GateConfig,
}

/// Orchestrates conditioner, smoother, gate, and session.
pub struct ScreeningPipeline<S: CalibrationStore> {
    conditioner: SignalConditioner,
    smoother: DisplaySmoother,
    gate: PositionGate,
    session: MeasurementSession,
    store: S,

    samples: LatestSlot<AccelSample>,
    frames: LatestSlot<LandmarkFrame>,

    /// Monotonic clock accumulated from tick deltas (milliseconds).
    clock_ms: u64,

    /// Latest accepted conditioned angle, held across ticks that see no
    /// new sample (or a withheld one).
    target_deg: f32,
}

impl<S: CalibrationStore> ScreeningPipeline<S> {
    /// Builds a pipeline, loading the persisted zero offset from the
    /// store. A load failure degrades to an uncalibrated start.
    pub fn new(config: PipelineConfig, store: S) -> Self {
        let zero_offset = match store.load() {
            Ok(offset) => offset.unwrap_or(0.0),
            Err(err) => {
                warn!("failed to load calibration, starting uncalibrated: {err:#}");
                0.0
            }
        };
        if zero_offset != 0.0 {
            info!("loaded zero offset {zero_offset:.2}°");
        }

        Self {
            conditioner: SignalConditioner::new(config.conditioner, zero_offset),
            smoother: DisplaySmoother::new(config.smoother),
            gate: PositionGate::new(config.gate),
            session: MeasurementSession::new(),
            store,
            samples: LatestSlot::new(),
            frames: LatestSlot::new(),
            clock_ms: 0,
            target_deg: 0.0,
        }
    }

    /// Writer handle for the sensor callback thread.
    pub fn sample_writer(&self) -> LatestSlot<AccelSample> {
        self.samples.clone()
    }

    /// Writer handle for the pose-estimation worker thread.
    pub fn frame_writer(&self) -> LatestSlot<LandmarkFrame> {
        self.frames.clone()
    }

    /// Publishes an acceleration sample (convenience for single-threaded
    /// callers; producers normally go through [`Self::sample_writer`]).
    pub fn push_acceleration_sample(&self, x: f32, y: f32, z: f32, timestamp_ms: u64) {
        self.samples.publish(AccelSample::new(timestamp_ms, x, y, z));
    }

    /// Publishes a landmark frame (most-recent-wins).
    pub fn push_landmark_frame(&self, frame: LandmarkFrame) {
        self.frames.publish(frame);
    }

    /// One frame-clock tick: drains the latest sample through the
    /// conditioner and advances the display spring.
    ///
    /// Returns the displayed angle. Ticks without a new sample (or with a
    /// withheld outlier) keep steering toward the previous target.
    pub fn tick(&mut self, dt_s: f32) -> f32 {
        let dt_ms = if dt_s > 0.0 && dt_s <= 0.1 {
            (dt_s * 1000.0) as u64
        } else {
            16
        };
        self.clock_ms += dt_ms.max(1);

        if let Some(sample) = self.samples.take() {
            if let Some(angle) = self.conditioner.ingest(&sample) {
                self.target_deg = angle;
            }
        }

        self.smoother.tick(self.target_deg, dt_s, self.clock_ms)
    }

    /// Re-zeros the inclinometer at the current orientation.
    ///
    /// Atomic across the stages: the conditioner takes its new offset, the
    /// display resets and freezes at 0° for the freeze window, and the
    /// offset is persisted. Returns the new offset in degrees.
    pub fn calibrate_zero(&mut self) -> Result<f32> {
        let offset = self.conditioner.calibrate();
        self.target_deg = 0.0;
        self.smoother.reset();
        self.smoother.begin_freeze(self.clock_ms);
        self.store.save(offset)?;
        info!("calibrated zero offset to {offset:.2}°");
        Ok(offset)
    }

    /// Evaluates the gate against the latest landmark frame.
    ///
    /// Returns `None` when no new frame has arrived since the last call;
    /// the hold timer only advances on fresh frames.
    pub fn evaluate_gate(&mut self) -> Option<GateEvent> {
        let frame = self.frames.take()?;
        Some(self.gate.evaluate(&frame))
    }

    /// Records the current displayed angle as the next reading
    /// (inclinometer mode).
    pub fn record_reading(&mut self) -> RecordOutcome {
        self.session.record(self.smoother.displayed())
    }

    /// Records the shoulder-tilt estimate captured by a completed hold
    /// (guided-pose mode). Returns `None` when no completion is pending.
    pub fn complete_on_hold(&mut self) -> Option<RecordOutcome> {
        let estimate = self.gate.completed_estimate()?;
        let outcome = self.session.record(estimate.shoulder_tilt_deg);
        // One completion maps to one reading; re-arm the gate for the
        // next position.
        self.gate.reset();
        Some(outcome)
    }

    /// Clears the session, the peak tracker, and the gate for a fresh
    /// measurement sequence.
    pub fn reset_session(&mut self) {
        self.session.reset();
        self.smoother.reset();
        self.gate.reset();
        info!("session reset");
    }

    /// Current displayed angle in degrees.
    pub fn current_displayed_angle(&self) -> f32 {
        self.smoother.displayed()
    }

    /// Running peak of |displayed| for this session, in degrees.
    pub fn current_peak(&self) -> f32 {
        self.smoother.peak()
    }

    /// Gate snapshot for rendering.
    pub fn gate_status(&self) -> GateStatus {
        self.gate.status()
    }

    /// The position the next reading will be taken at.
    pub fn current_position(&self) -> Option<ReadingPosition> {
        self.session.current_position()
    }

    /// Readings recorded so far plus completeness.
    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Submission-ready record for the current session state.
    pub fn finalize_session(&self) -> ScreeningRecord {
        self.session.finalize()
    }
}
