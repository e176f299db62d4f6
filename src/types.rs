//! Core data types for the screening pipeline.
//!
//! This module defines the input contracts (acceleration samples, landmark
//! frames) and the output records (session aggregates, screening records)
//! shared across the pipeline stages.
//!
//! Design principle: types should make intent obvious. If a concept exists,
//! it gets a type. Never pass raw tuples or untyped collections across
//! boundaries.

use serde::{Deserialize, Serialize};

/// A single three-axis accelerometer sample.
///
/// This is the minimal inclinometer input contract: raw acceleration on
/// three axes plus a monotonic timestamp. It is never interpreted here,
/// only preserved for the signal conditioner.
///
/// Design note: f32 keeps the on-device footprint small; inclinometer
/// precision requirements are far below f32 resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    /// Monotonic timestamp in milliseconds. Required for temporal ordering.
    pub timestamp_ms: u64,

    /// Acceleration along the device x axis (m/s² or g, units cancel).
    pub x: f32,

    /// Acceleration along the device y axis.
    pub y: f32,

    /// Acceleration along the device z axis.
    pub z: f32,
}

impl AccelSample {
    /// Creates a new acceleration sample.
    ///
    /// Assumption: timestamps are monotonically increasing within a stream.
    pub fn new(timestamp_ms: u64, x: f32, y: f32, z: f32) -> Self {
        Self { timestamp_ms, x, y, z }
    }

    /// Magnitude of the acceleration vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A single body landmark position in normalized image coordinates.
///
/// Both axes are in [0, 1] with (0, 0) at the top-left of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Fixed anatomical numbering for the landmarks the gate consumes.
///
/// Indices follow the standard 33-point pose topology emitted by the
/// external estimation model. Only the torso landmarks are used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIndex {
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftHip = 23,
    RightHip = 24,
}

/// One set of landmark positions from the pose-estimation worker.
///
/// Only the most recent frame is ever retained; frames are overwritten
/// whole (most-recent-wins), never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Monotonic timestamp in milliseconds at frame capture.
    pub timestamp_ms: u64,

    /// Landmark positions indexed by the fixed anatomical numbering.
    /// A short list simply means the trailing landmarks were not detected.
    points: Vec<LandmarkPoint>,
}

impl LandmarkFrame {
    /// Creates a frame from an ordered landmark list.
    pub fn new(timestamp_ms: u64, points: Vec<LandmarkPoint>) -> Self {
        Self { timestamp_ms, points }
    }

    /// Looks up a landmark by anatomical index.
    ///
    /// Returns None when the model did not produce that landmark; callers
    /// treat a missing required landmark as a failed check, never an error.
    pub fn point(&self, index: LandmarkIndex) -> Option<LandmarkPoint> {
        self.points.get(index as usize).copied()
    }

    /// Number of landmarks present in this frame.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the frame carries no landmarks at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One of the three anatomical spinal regions readings aggregate into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Thoracic,
    Thoracolumbar,
    Lumbar,
}

/// The five measurement positions of the screening protocol, in order.
///
/// Each reading slot maps to a fixed region; the mapping drives both the
/// operator prompts and the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingPosition {
    UpperThoracic,
    LowerThoracic,
    Thoracolumbar,
    UpperLumbar,
    LowerLumbar,
}

impl ReadingPosition {
    /// All positions in protocol order.
    pub const ALL: [ReadingPosition; 5] = [
        ReadingPosition::UpperThoracic,
        ReadingPosition::LowerThoracic,
        ReadingPosition::Thoracolumbar,
        ReadingPosition::UpperLumbar,
        ReadingPosition::LowerLumbar,
    ];

    /// Position for a 0-based reading index, if within the protocol.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The spinal region this position's reading is assigned to.
    pub fn region(&self) -> Region {
        match self {
            ReadingPosition::UpperThoracic | ReadingPosition::LowerThoracic => Region::Thoracic,
            ReadingPosition::Thoracolumbar => Region::Thoracolumbar,
            ReadingPosition::UpperLumbar | ReadingPosition::LowerLumbar => Region::Lumbar,
        }
    }

    /// Operator-facing prompt for this position.
    pub fn prompt(&self) -> &'static str {
        match self {
            ReadingPosition::UpperThoracic => "Place the device on the upper thoracic spine",
            ReadingPosition::LowerThoracic => "Place the device on the lower thoracic spine",
            ReadingPosition::Thoracolumbar => "Place the device at the thoracolumbar junction",
            ReadingPosition::UpperLumbar => "Place the device on the upper lumbar spine",
            ReadingPosition::LowerLumbar => "Place the device on the lower lumbar spine",
        }
    }
}

/// Per-region aggregates plus the overall screening score.
///
/// Produced by the measurement session once five readings exist; an
/// incomplete session aggregates to all zeros so callers detect
/// incompleteness via the session length, not an error channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionAggregate {
    /// Mean of readings 0 and 1 (degrees).
    pub thoracic: f32,

    /// Reading 2 (degrees). Tracked and reported but deliberately absent
    /// from the score; see [`SessionAggregate::score`].
    pub thoracolumbar: f32,

    /// Mean of readings 3 and 4 (degrees).
    pub lumbar: f32,

    /// Overall score in [0, 100]: `clamp(100 - (thoracic + lumbar), 0, 100)`.
    /// The thoracolumbar region does not enter the score; this asymmetry is
    /// part of the established scoring behavior and is preserved as is.
    pub score: f32,
}

impl SessionAggregate {
    /// The all-zero aggregate reported for incomplete sessions.
    pub fn zeroed() -> Self {
        Self {
            thoracic: 0.0,
            thoracolumbar: 0.0,
            lumbar: 0.0,
            score: 0.0,
        }
    }
}

/// A completed measurement record, ready for external submission.
///
/// The core produces this; transport, encoding, and persistence are the
/// submission collaborator's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRecord {
    /// The raw readings in protocol order (absolute degrees).
    pub readings: Vec<f32>,

    /// Region aggregates and score. Zeroed when `complete` is false.
    pub aggregate: SessionAggregate,

    /// True when all five readings are present.
    pub complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_sample_magnitude() {
        let sample = AccelSample::new(0, 3.0, 4.0, 0.0);
        assert!((sample.magnitude() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_landmark_lookup_by_index() {
        let mut points = vec![LandmarkPoint::new(0.0, 0.0); 25];
        points[LandmarkIndex::LeftShoulder as usize] = LandmarkPoint::new(0.7, 0.4);
        let frame = LandmarkFrame::new(100, points);

        let shoulder = frame.point(LandmarkIndex::LeftShoulder).unwrap();
        assert!((shoulder.x - 0.7).abs() < 1e-6);
        assert!((shoulder.y - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_landmark_missing_index() {
        // A frame with only 12 points has no right shoulder (index 12).
        let frame = LandmarkFrame::new(0, vec![LandmarkPoint::new(0.5, 0.5); 12]);
        assert!(frame.point(LandmarkIndex::LeftShoulder).is_some());
        assert!(frame.point(LandmarkIndex::RightShoulder).is_none());
    }

    #[test]
    fn test_reading_position_region_mapping() {
        assert_eq!(ReadingPosition::UpperThoracic.region(), Region::Thoracic);
        assert_eq!(ReadingPosition::LowerThoracic.region(), Region::Thoracic);
        assert_eq!(ReadingPosition::Thoracolumbar.region(), Region::Thoracolumbar);
        assert_eq!(ReadingPosition::UpperLumbar.region(), Region::Lumbar);
        assert_eq!(ReadingPosition::LowerLumbar.region(), Region::Lumbar);
    }

    #[test]
    fn test_reading_position_from_index() {
        assert_eq!(
            ReadingPosition::from_index(0),
            Some(ReadingPosition::UpperThoracic)
        );
        assert_eq!(
            ReadingPosition::from_index(4),
            Some(ReadingPosition::LowerLumbar)
        );
        assert_eq!(ReadingPosition::from_index(5), None);
    }
}
