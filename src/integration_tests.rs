//! Cross-stage integration tests.
//!
//! These drive the full pipeline the way the app does: simulated sensor
//! streams, frame-clock ticks, calibration, and complete five-reading
//! sessions in both modes.

#![cfg(test)]

use crate::gate::{GateEvent, GateReason};
use crate::pipeline::{PipelineConfig, ScreeningPipeline};
use crate::session::RecordOutcome;
use crate::store::MemoryStore;
use crate::types::{LandmarkFrame, LandmarkIndex, LandmarkPoint};

const DT: f32 = 0.016;

fn pipeline() -> ScreeningPipeline<MemoryStore> {
    ScreeningPipeline::new(PipelineConfig::default(), MemoryStore::new())
}

/// Feeds a constant gravity direction and ticks until the display settles.
fn settle_at(p: &mut ScreeningPipeline<MemoryStore>, x: f32, y: f32, start_ms: u64, ticks: u64) {
    for i in 0..ticks {
        p.push_acceleration_sample(x, y, 0.0, start_ms + i * 16);
        p.tick(DT);
    }
}

/// A frame with the subject correctly framed and facing away (mirrored
/// preview coordinates).
fn good_frame(ts: u64) -> LandmarkFrame {
    let mut points = vec![LandmarkPoint::new(-1.0, -1.0); 25];
    points[LandmarkIndex::LeftShoulder as usize] = LandmarkPoint::new(0.35, 0.4);
    points[LandmarkIndex::RightShoulder as usize] = LandmarkPoint::new(0.65, 0.4);
    points[LandmarkIndex::LeftHip as usize] = LandmarkPoint::new(0.40, 0.7);
    points[LandmarkIndex::RightHip as usize] = LandmarkPoint::new(0.60, 0.7);
    LandmarkFrame::new(ts, points)
}

#[test]
fn test_inclinometer_session_end_to_end() {
    let mut p = pipeline();

    // Level the device and calibrate.
    settle_at(&mut p, 0.0, 9.81, 0, 50);
    p.calibrate_zero().unwrap();
    settle_at(&mut p, 0.0, 9.81, 2000, 50);
    assert!(p.current_displayed_angle().abs() < 0.5);

    // Five readings at alternating small tilts.
    let tilts: [(f32, f32); 5] = [
        (-0.86, 9.77),
        (-1.2, 9.74),
        (-0.51, 9.80),
        (-0.69, 9.79),
        (-1.03, 9.76),
    ];
    for (i, (x, y)) in tilts.iter().enumerate() {
        settle_at(&mut p, *x, *y, 5_000 + i as u64 * 10_000, 400);
        assert_eq!(p.record_reading(), RecordOutcome::Accepted { index: i });
    }

    let record = p.finalize_session();
    assert!(record.complete);
    assert_eq!(record.readings.len(), 5);
    // Small tilts in, plausible score out.
    assert!(record.aggregate.score > 80.0 && record.aggregate.score <= 100.0);

    // A sixth trigger must not grow the session.
    assert_eq!(p.record_reading(), RecordOutcome::AlreadyComplete);
    assert_eq!(p.session_snapshot().readings.len(), 5);
}

#[test]
fn test_pose_session_end_to_end() {
    let mut p = pipeline();

    for reading in 0..5usize {
        let base = reading as u64 * 10_000;

        // Subject wanders in, then holds for the full window.
        p.push_landmark_frame(LandmarkFrame::new(base, vec![]));
        assert_eq!(
            p.evaluate_gate(),
            Some(GateEvent::Unsatisfied(GateReason::LandmarksMissing))
        );

        for step in 0..=10u64 {
            p.push_landmark_frame(good_frame(base + 100 + step * 300));
            let ev = p.evaluate_gate().unwrap();
            if step == 10 {
                assert!(matches!(ev, GateEvent::Completed(_)), "step {step}: {ev:?}");
            } else {
                assert!(matches!(ev, GateEvent::Holding { .. }), "step {step}: {ev:?}");
            }
        }

        assert_eq!(
            p.complete_on_hold(),
            Some(RecordOutcome::Accepted { index: reading })
        );
        // The gate re-arms for the next position.
        assert!(!p.gate_status().completed);
    }

    let record = p.finalize_session();
    assert!(record.complete);
    // Level shoulders give near-zero readings and a near-perfect score.
    assert!(record.aggregate.score > 99.0);
}

#[test]
fn test_gate_hold_does_not_survive_interruption() {
    let mut p = pipeline();

    p.push_landmark_frame(good_frame(0));
    p.evaluate_gate();
    p.push_landmark_frame(good_frame(2900));
    assert!(matches!(
        p.evaluate_gate(),
        Some(GateEvent::Holding { remaining_seconds: 1 })
    ));

    // Break the hold just before completion.
    p.push_landmark_frame(LandmarkFrame::new(2950, vec![]));
    assert!(matches!(p.evaluate_gate(), Some(GateEvent::Unsatisfied(_))));

    // Re-satisfying at 3.0 s must start a fresh 3-second hold.
    p.push_landmark_frame(good_frame(3000));
    assert!(matches!(
        p.evaluate_gate(),
        Some(GateEvent::Holding { remaining_seconds: 3 })
    ));

    // No completion is pending, so pose capture has nothing to record.
    assert_eq!(p.complete_on_hold(), None);
}

#[test]
fn test_evaluate_gate_requires_fresh_frame() {
    let mut p = pipeline();
    assert_eq!(p.evaluate_gate(), None);

    p.push_landmark_frame(good_frame(0));
    assert!(p.evaluate_gate().is_some());
    // The slot was drained; evaluating again without a new frame is a
    // no-op rather than a re-evaluation of stale data.
    assert_eq!(p.evaluate_gate(), None);
}

#[test]
fn test_calibration_survives_restart_via_store() {
    let mut store = MemoryStore::new();

    {
        let mut p = ScreeningPipeline::new(PipelineConfig::default(), store.clone());
        settle_at(&mut p, 0.0, 9.81, 0, 50);
        let offset = p.calibrate_zero().unwrap();
        // MemoryStore clones don't share state; re-save into the outer
        // handle to emulate the installation-level store.
        use crate::store::CalibrationStore;
        store.save(offset).unwrap();
    }

    // A fresh pipeline built over the same store starts calibrated.
    let mut p = ScreeningPipeline::new(PipelineConfig::default(), store);
    settle_at(&mut p, 0.0, 9.81, 0, 80);
    assert!(p.current_displayed_angle().abs() < 0.5);
}

#[test]
fn test_peak_tracks_session_maximum() {
    let mut p = pipeline();
    settle_at(&mut p, 0.0, 9.81, 0, 50);
    p.calibrate_zero().unwrap();

    // Swing out to a noticeable tilt, then back to level.
    settle_at(&mut p, -1.73, 9.66, 2_000, 400);
    let peak = p.current_peak();
    assert!(peak > 5.0, "peak {peak}");

    settle_at(&mut p, 0.0, 9.81, 12_000, 400);
    assert!(p.current_peak() >= peak);
}
