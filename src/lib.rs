//! Spinal-curvature screening core.
//!
//! This crate converts noisy sensor input into a stable screening
//! measurement in two modes:
//!
//! - **Digital inclinometer**: raw three-axis acceleration samples are
//!   conditioned into a tilt angle ([`conditioner`]) and rendered through
//!   a critically damped display spring ([`smoother`]).
//! - **Guided pose**: normalized body-landmark frames are gated on subject
//!   orientation and framing, with a hold timer that must stay satisfied
//!   before a coarse pose-derived reading fires ([`gate`]).
//!
//! Either mode feeds a five-reading measurement [`session`] that
//! aggregates per-region angles and a 0-100 score. The [`pipeline`]
//! module wires the stages together behind the narrow interface the
//! surrounding app consumes; [`store`] abstracts the persisted zero
//! offset.
//!
//! # Design Philosophy
//!
//! - **Latest value wins**: sensor and landmark delivery use single-slot
//!   handoff cells; the display loop never blocks on a fresh input.
//! - **No NaN downstream**: numeric failures are prevented at the source
//!   (floored denominators, sanitized inputs), never detected later.
//! - **Monotonic time only**: the hold and freeze windows are measured
//!   against monotonic millisecond clocks, never wall-clock time.
//!
//! # Example
//!
//! ```
//! use spinescreen::pipeline::{PipelineConfig, ScreeningPipeline};
//! use spinescreen::store::MemoryStore;
//!
//! let mut pipeline = ScreeningPipeline::new(PipelineConfig::default(), MemoryStore::new());
//!
//! // Sensor callback thread publishes; the frame clock ticks.
//! pipeline.push_acceleration_sample(0.0, 9.81, 0.0, 0);
//! let displayed = pipeline.tick(0.016);
//! assert!(displayed.is_finite());
//! ```

pub mod conditioner;
pub mod gate;
pub mod pipeline;
pub mod session;
pub mod smoother;
pub mod store;
pub mod types;

mod integration_tests;

// Re-export the types most callers need.
pub use conditioner::{ConditionerConfig, SignalConditioner};
pub use gate::{
    GateConfig, GateConfigError, GateEvent, GateReason, GateStatus, GuideZone, PoseEstimate,
    PositionGate,
};
pub use pipeline::{LatestSlot, PipelineConfig, ScreeningPipeline};
pub use session::{MeasurementSession, RecordOutcome, SessionSnapshot, REQUIRED_READINGS};
pub use smoother::{DisplaySmoother, SmootherConfig};
pub use store::{CalibrationStore, JsonFileStore, MemoryStore};
pub use types::{
    AccelSample, LandmarkFrame, LandmarkIndex, LandmarkPoint, ReadingPosition, Region,
    ScreeningRecord, SessionAggregate,
};
