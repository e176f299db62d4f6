//! Guided-pose position gating.
//!
//! In guided-pose mode the subject stands with their back to the camera
//! inside a pair of nested on-screen guide zones. This module decides, per
//! landmark frame, whether the subject is correctly oriented and framed,
//! and runs the hold timer that must stay continuously satisfied before a
//! measurement fires.
//!
//! Checks, in priority order:
//! 1. Orientation ("facing away"): viewed from behind in a mirrored
//!    preview, the subject's left shoulder appears at a larger x than the
//!    right. A front-facing subject fails this immediately.
//! 2. Outer containment: both shoulders inside the outer guide zone.
//! 3. Inner exclusion: both shoulders outside the inner zone, i.e. the
//!    subject stands far enough back.
//!
//! The resulting pose angle estimate is a coarse geometric proxy derived
//! from shoulder and hip lines. It is deliberately kept in its own
//! [`PoseEstimate`] type and must not be presented as equivalent in
//! precision to the inclinometer pipeline.

use log::{debug, info};
use thiserror::Error;

use crate::types::{LandmarkFrame, LandmarkIndex, LandmarkPoint};

/// Guide-zone configuration errors, caught at construction time.
#[derive(Debug, Error, PartialEq)]
pub enum GateConfigError {
    #[error("rectangle has non-positive extent: {width}x{height}")]
    DegenerateRect { width: f32, height: f32 },

    #[error("rectangle exceeds the normalized frame: {width}x{height}")]
    RectOutOfBounds { width: f32, height: f32 },

    #[error("outer zone must strictly contain the inner zone")]
    InnerNotContained,
}

/// An axis-aligned rectangle in normalized [0, 1] coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl NormRect {
    /// Builds a rectangle of the given extent centered on (0.5, 0.5).
    fn centered(width: f32, height: f32) -> Self {
        Self {
            left: 0.5 - width / 2.0,
            top: 0.5 - height / 2.0,
            right: 0.5 + width / 2.0,
            bottom: 0.5 + height / 2.0,
        }
    }

    /// True when the point lies inside (inclusive).
    pub fn contains(&self, p: LandmarkPoint) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

/// The nested outer/inner guide zones.
///
/// Both rectangles are re-centered to be symmetric about (0.5, 0.5); only
/// their extents are configurable. The outer zone strictly containing the
/// inner zone is a construction invariant, never a runtime condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideZone {
    outer: NormRect,
    inner: NormRect,
}

impl GuideZone {
    /// Creates a guide zone from outer and inner extents (normalized
    /// width/height pairs).
    pub fn new(
        outer_width: f32,
        outer_height: f32,
        inner_width: f32,
        inner_height: f32,
    ) -> Result<Self, GateConfigError> {
        for &(w, h) in &[(outer_width, outer_height), (inner_width, inner_height)] {
            if w <= 0.0 || h <= 0.0 {
                return Err(GateConfigError::DegenerateRect { width: w, height: h });
            }
            if w > 1.0 || h > 1.0 {
                return Err(GateConfigError::RectOutOfBounds { width: w, height: h });
            }
        }
        if inner_width >= outer_width || inner_height >= outer_height {
            return Err(GateConfigError::InnerNotContained);
        }

        Ok(Self {
            outer: NormRect::centered(outer_width, outer_height),
            inner: NormRect::centered(inner_width, inner_height),
        })
    }

    pub fn outer(&self) -> NormRect {
        self.outer
    }

    pub fn inner(&self) -> NormRect {
        self.inner
    }
}

impl Default for GuideZone {
    /// Default framing: a generous outer zone with a small central
    /// keep-out area.
    fn default() -> Self {
        Self {
            outer: NormRect::centered(0.9, 0.9),
            inner: NormRect::centered(0.25, 0.4),
        }
    }
}

/// Gate tuning.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// The nested guide zones.
    pub zone: GuideZone,

    /// Margin (normalized units) by which the left-shoulder x must exceed
    /// the right-shoulder x for the subject to count as facing away.
    pub orientation_margin: f32,

    /// Continuous time (ms) the gate must stay satisfied before completion.
    pub hold_ms: u64,

    /// Whether the preview feed is horizontally mirrored (typical selfie
    /// preview). Landmarks are un-mirrored before the checks.
    pub mirrored: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            zone: GuideZone::default(),
            orientation_margin: 0.02,
            hold_ms: 3000,
            mirrored: true,
        }
    }
}

/// Why the gate is currently unsatisfied, in check priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    /// Subject appears to be facing the camera (or sideways).
    FacingCamera,
    /// At least one shoulder is outside the outer guide zone.
    OutsideOuterZone,
    /// At least one shoulder is inside the inner keep-out zone.
    InsideInnerZone,
    /// Required landmarks were not detected in the frame.
    LandmarksMissing,
}

/// Coarse pose-derived angle estimate captured at gate completion.
///
/// Approximate by construction: shoulder-line tilt stands in for one
/// spinal region, hip-line tilt relative to the shoulder line for another.
/// No clinical accuracy is claimed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseEstimate {
    /// Tilt of the shoulder line in degrees (0 = level).
    pub shoulder_tilt_deg: f32,

    /// Tilt of the hip line relative to the shoulder line, in degrees.
    /// Zero when the hips were not detected.
    pub hip_relative_tilt_deg: f32,
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateEvent {
    /// One of the checks failed; the hold timer (if running) was reset.
    Unsatisfied(GateReason),

    /// All checks hold; `remaining_seconds` whole seconds (rounded up)
    /// until completion.
    Holding { remaining_seconds: u32 },

    /// The hold completed. Fires exactly once per session.
    Completed(PoseEstimate),

    /// A completion already fired; evaluations are no-ops until `reset()`.
    Latched,
}

/// Renderer-facing snapshot of the gate, queryable between evaluations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateStatus {
    /// True while the hold timer is running.
    pub holding: bool,

    /// Whole seconds remaining in the hold (0 when not holding).
    pub remaining_seconds: u32,

    /// True once a completion has fired for this session.
    pub completed: bool,

    /// The failure reason from the most recent unsatisfied evaluation.
    pub reason: Option<GateReason>,
}

/// Hold-timer states.
#[derive(Debug, Clone, Copy, PartialEq)]
enum HoldState {
    Idle,
    Holding { since_ms: u64 },
    Completed,
}

/// Evaluates subject positioning per landmark frame and runs the hold
/// timer.
///
/// Evaluations must be serialized per session; each call computes the full
/// transition synchronously against the frame's monotonic timestamp.
#[derive(Debug, Clone)]
pub struct PositionGate {
    config: GateConfig,
    state: HoldState,
    last_reason: Option<GateReason>,
    last_remaining_s: u32,
    estimate: Option<PoseEstimate>,
}

impl PositionGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            state: HoldState::Idle,
            last_reason: None,
            last_remaining_s: 0,
            estimate: None,
        }
    }

    /// Evaluates one landmark frame and advances the hold state machine.
    ///
    /// The frame's timestamp drives the timer, so evaluation order must
    /// follow capture order.
    pub fn evaluate(&mut self, frame: &LandmarkFrame) -> GateEvent {
        if matches!(self.state, HoldState::Completed) {
            return GateEvent::Latched;
        }

        let now_ms = frame.timestamp_ms;

        match self.check_frame(frame) {
            Err(reason) => {
                if matches!(self.state, HoldState::Holding { .. }) {
                    debug!("hold interrupted: {reason:?}");
                }
                self.state = HoldState::Idle;
                self.last_reason = Some(reason);
                self.last_remaining_s = 0;
                GateEvent::Unsatisfied(reason)
            }
            Ok(shoulders) => {
                self.last_reason = None;
                let since_ms = match self.state {
                    HoldState::Holding { since_ms } => since_ms,
                    _ => {
                        debug!("hold started at {now_ms} ms");
                        self.state = HoldState::Holding { since_ms: now_ms };
                        now_ms
                    }
                };

                let elapsed = now_ms.saturating_sub(since_ms);
                if elapsed >= self.config.hold_ms {
                    let estimate = self.pose_estimate(frame, shoulders);
                    self.state = HoldState::Completed;
                    self.estimate = Some(estimate);
                    self.last_remaining_s = 0;
                    info!(
                        "hold completed after {elapsed} ms, shoulder tilt {:.1}°",
                        estimate.shoulder_tilt_deg
                    );
                    GateEvent::Completed(estimate)
                } else {
                    let remaining_ms = self.config.hold_ms - elapsed;
                    let remaining_seconds = remaining_ms.div_ceil(1000) as u32;
                    self.last_remaining_s = remaining_seconds;
                    GateEvent::Holding { remaining_seconds }
                }
            }
        }
    }

    /// Returns to `Idle`, clearing the latch and any captured estimate.
    pub fn reset(&mut self) {
        self.state = HoldState::Idle;
        self.last_reason = None;
        self.last_remaining_s = 0;
        self.estimate = None;
    }

    /// Current snapshot for rendering.
    pub fn status(&self) -> GateStatus {
        GateStatus {
            holding: matches!(self.state, HoldState::Holding { .. }),
            remaining_seconds: self.last_remaining_s,
            completed: matches!(self.state, HoldState::Completed),
            reason: self.last_reason,
        }
    }

    /// The estimate captured at completion, if one has fired.
    pub fn completed_estimate(&self) -> Option<PoseEstimate> {
        self.estimate
    }

    /// Runs the positioning checks in priority order. On success returns
    /// the shoulder points in un-mirrored view space for downstream
    /// geometry.
    fn check_frame(
        &self,
        frame: &LandmarkFrame,
    ) -> Result<(LandmarkPoint, LandmarkPoint), GateReason> {
        let (left, right) = match (
            frame.point(LandmarkIndex::LeftShoulder),
            frame.point(LandmarkIndex::RightShoulder),
        ) {
            (Some(l), Some(r)) => (self.view(l), self.view(r)),
            _ => return Err(GateReason::LandmarksMissing),
        };

        // Facing away: seen from behind, the anatomical left shoulder sits
        // at larger x than the right (the sides swap relative to a frontal
        // view).
        if left.x <= right.x + self.config.orientation_margin {
            return Err(GateReason::FacingCamera);
        }

        let zone = &self.config.zone;
        if !zone.outer.contains(left) || !zone.outer.contains(right) {
            return Err(GateReason::OutsideOuterZone);
        }
        if zone.inner.contains(left) || zone.inner.contains(right) {
            return Err(GateReason::InsideInnerZone);
        }

        Ok((left, right))
    }

    /// Undoes the preview mirroring so the checks reason in subject space.
    fn view(&self, p: LandmarkPoint) -> LandmarkPoint {
        if self.config.mirrored {
            LandmarkPoint::new(1.0 - p.x, p.y)
        } else {
            p
        }
    }

    /// Coarse angle estimate from the completing frame's geometry.
    fn pose_estimate(
        &self,
        frame: &LandmarkFrame,
        (left, right): (LandmarkPoint, LandmarkPoint),
    ) -> PoseEstimate {
        let shoulder_tilt_deg = line_tilt_deg(right, left);

        let hip_relative_tilt_deg = match (
            frame.point(LandmarkIndex::LeftHip),
            frame.point(LandmarkIndex::RightHip),
        ) {
            (Some(lh), Some(rh)) => {
                line_tilt_deg(self.view(rh), self.view(lh)) - shoulder_tilt_deg
            }
            _ => 0.0,
        };

        PoseEstimate {
            shoulder_tilt_deg,
            hip_relative_tilt_deg,
        }
    }
}

impl Default for PositionGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

/// Tilt of the line from `a` to `b` in degrees, 0 = horizontal.
///
/// Image y grows downward, so the sign is flipped to keep "left side up"
/// positive.
fn line_tilt_deg(a: LandmarkPoint, b: LandmarkPoint) -> f32 {
    (-(b.y - a.y)).atan2(b.x - a.x).to_degrees()
}
