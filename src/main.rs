//! Spinal-curvature screening core.
//!
//! Standalone demo: simulates a short inclinometer session against the
//! in-memory calibration store. For library use, see lib.rs.

use spinescreen::pipeline::{PipelineConfig, ScreeningPipeline};
use spinescreen::store::MemoryStore;

fn main() {
    env_logger::init();

    println!("spinescreen v0.1.0");
    println!("screening measurement core demo\n");

    let mut pipeline = ScreeningPipeline::new(PipelineConfig::default(), MemoryStore::new());

    // Level the simulated device and calibrate.
    feed(&mut pipeline, 0.0, 9.81, 0, 60);
    let offset = pipeline.calibrate_zero().expect("in-memory save cannot fail");
    println!("calibrated, zero offset {offset:.2}°");

    // Five readings at small simulated trunk tilts.
    let tilts: [(f32, f32); 5] = [
        (-0.86, 9.77),
        (-1.20, 9.74),
        (-0.51, 9.80),
        (-0.69, 9.79),
        (-1.03, 9.76),
    ];
    for (i, (x, y)) in tilts.iter().enumerate() {
        feed(&mut pipeline, *x, *y, 2_000 + i as u64 * 8_000, 400);
        let position = pipeline
            .current_position()
            .map(|p| p.prompt())
            .unwrap_or("(complete)");
        pipeline.record_reading();
        println!(
            "reading {}: {:>5.2}°  [{position}]",
            i + 1,
            pipeline.current_displayed_angle().abs()
        );
    }

    let record = pipeline.finalize_session();
    println!("\nthoracic      {:.1}°", record.aggregate.thoracic);
    println!("thoracolumbar {:.1}°", record.aggregate.thoracolumbar);
    println!("lumbar        {:.1}°", record.aggregate.lumbar);
    println!("score         {:.1}", record.aggregate.score);
}

/// Feeds a constant gravity direction while ticking the display clock.
fn feed(pipeline: &mut ScreeningPipeline<MemoryStore>, x: f32, y: f32, start_ms: u64, ticks: u64) {
    for i in 0..ticks {
        pipeline.push_acceleration_sample(x, y, 0.0, start_ms + i * 16);
        pipeline.tick(0.016);
    }
}
