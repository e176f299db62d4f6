//! Multi-reading measurement session and scoring.
//!
//! A screening session collects five readings (absolute degrees) in a
//! fixed anatomical order, then collapses them into per-region aggregates
//! and a 0-100 score. Readings are append-only until an explicit reset.

use log::info;
use serde::{Deserialize, Serialize};

use crate::types::{ReadingPosition, ScreeningRecord, SessionAggregate};

/// Number of readings in a complete session.
pub const REQUIRED_READINGS: usize = 5;

/// Outcome of a `record` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The reading was appended at `index` (0-based).
    Accepted { index: usize },

    /// The session already holds five readings; nothing was appended.
    /// The caller routes this to finalize/reset handling.
    AlreadyComplete,
}

/// Lightweight session snapshot for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub readings: Vec<f32>,
    pub complete: bool,
}

/// An ordered, bounded collection of screening readings.
#[derive(Debug, Clone, Default)]
pub struct MeasurementSession {
    readings: Vec<f32>,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one reading, stored as an absolute value.
    ///
    /// Once five readings exist further calls are no-ops; existing entries
    /// are never mutated.
    pub fn record(&mut self, value_deg: f32) -> RecordOutcome {
        if self.readings.len() >= REQUIRED_READINGS {
            return RecordOutcome::AlreadyComplete;
        }
        let index = self.readings.len();
        self.readings.push(value_deg.abs());
        info!(
            "recorded reading {} of {REQUIRED_READINGS}: {:.1}°",
            index + 1,
            value_deg.abs()
        );
        RecordOutcome::Accepted { index }
    }

    /// The position the next reading will be taken at, or None when the
    /// session is complete. Drives the operator prompt.
    pub fn current_position(&self) -> Option<ReadingPosition> {
        ReadingPosition::from_index(self.readings.len())
    }

    /// Number of readings recorded so far.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// True once all five readings are present.
    pub fn is_complete(&self) -> bool {
        self.readings.len() >= REQUIRED_READINGS
    }

    /// Current readings and completeness, for display.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            readings: self.readings.clone(),
            complete: self.is_complete(),
        }
    }

    /// Region aggregates and score.
    ///
    /// An incomplete session aggregates to all zeros; callers detect
    /// incompleteness via [`MeasurementSession::len`], not an error.
    pub fn aggregate(&self) -> SessionAggregate {
        if !self.is_complete() {
            return SessionAggregate::zeroed();
        }

        let r = &self.readings;
        let thoracic = (r[0] + r[1]) / 2.0;
        let thoracolumbar = r[2];
        let lumbar = (r[3] + r[4]) / 2.0;

        // The thoracolumbar reading is deliberately excluded from the
        // score; this mirrors the established scoring behavior.
        let score = (100.0 - (thoracic + lumbar)).clamp(0.0, 100.0);

        SessionAggregate {
            thoracic,
            thoracolumbar,
            lumbar,
            score,
        }
    }

    /// Produces the submission-ready record for the current state.
    pub fn finalize(&self) -> ScreeningRecord {
        ScreeningRecord {
            readings: self.readings.clone(),
            aggregate: self.aggregate(),
            complete: self.is_complete(),
        }
    }

    /// Clears all readings, returning to an empty session.
    pub fn reset(&mut self) {
        self.readings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;

    #[test]
    fn test_reference_aggregation() {
        let mut s = MeasurementSession::new();
        for v in [5.0, 7.0, 3.0, 4.0, 6.0] {
            s.record(v);
        }

        let agg = s.aggregate();
        assert!((agg.thoracic - 6.0).abs() < 1e-6);
        assert!((agg.thoracolumbar - 3.0).abs() < 1e-6);
        assert!((agg.lumbar - 5.0).abs() < 1e-6);
        assert!((agg.score - 89.0).abs() < 1e-6);
    }

    #[test]
    fn test_score_clamped_to_zero() {
        let mut s = MeasurementSession::new();
        for v in [60.0, 60.0, 10.0, 60.0, 60.0] {
            s.record(v);
        }
        assert_eq!(s.aggregate().score, 0.0);
    }

    #[test]
    fn test_readings_stored_as_absolute() {
        let mut s = MeasurementSession::new();
        s.record(-8.0);
        assert!((s.snapshot().readings[0] - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_sixth_reading_is_a_no_op() {
        let mut s = MeasurementSession::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            assert!(matches!(s.record(v), RecordOutcome::Accepted { .. }));
        }
        assert!(s.is_complete());

        let before = s.snapshot();
        assert_eq!(s.record(9.0), RecordOutcome::AlreadyComplete);
        assert_eq!(s.snapshot(), before);
        assert_eq!(s.len(), REQUIRED_READINGS);
    }

    #[test]
    fn test_incomplete_session_aggregates_to_zero() {
        let mut s = MeasurementSession::new();
        s.record(10.0);
        s.record(10.0);
        assert_eq!(s.aggregate(), SessionAggregate::zeroed());

        let record = s.finalize();
        assert!(!record.complete);
        assert_eq!(record.readings.len(), 2);
    }

    #[test]
    fn test_position_advances_with_readings() {
        let mut s = MeasurementSession::new();
        assert_eq!(s.current_position(), Some(ReadingPosition::UpperThoracic));
        s.record(1.0);
        s.record(1.0);
        assert_eq!(s.current_position(), Some(ReadingPosition::Thoracolumbar));
        assert_eq!(s.current_position().unwrap().region(), Region::Thoracolumbar);
        for _ in 0..3 {
            s.record(1.0);
        }
        assert_eq!(s.current_position(), None);
    }

    #[test]
    fn test_reset_empties_session() {
        let mut s = MeasurementSession::new();
        for _ in 0..5 {
            s.record(4.0);
        }
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.current_position(), Some(ReadingPosition::UpperThoracic));
    }
}
