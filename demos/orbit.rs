use petalsonic_spatial::*;
use std::sync::Arc;
use std::time::Duration;

/// Moves one emitter in a circle around the listener while the render thread
/// prints the panning parameters it produces.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let desc = PetalSonicWorldDesc {
        block_size: 4800, // 100 ms blocks keep the output readable
        max_objects: 16,
        ..Default::default()
    };
    let world = PetalSonicWorld::new(desc.clone())?;

    // Simple inverse-distance gain, clamped to unity inside distance_ref.
    let model = |distance: f64, params: &DistanceParams| {
        (params.distance_ref / distance.max(params.distance_ref)).powf(params.rolloff)
    };
    let renderer = world.create_renderer(Arc::new(model))?;

    let panner = |handle: ObjectHandle, input: &PannerInput| {
        println!(
            "{}: azimuth {:6.1}  elevation {:5.1}  distance {:5.2}  gain {:.3}",
            handle, input.azimuth, input.elevation, input.distance, input.gain
        );
    };
    let mut engine = PetalSonicEngine::new(desc, renderer, panner)?;
    engine.start()?;

    let (handle, source) = world.create_source3d()?;
    let radius = 3.0;
    for step in 0..40 {
        let angle = step as f64 / 40.0 * std::f64::consts::TAU;
        let height = (angle * 2.0).sin();
        source.set_position(Vec3::new(radius * angle.sin(), radius * angle.cos(), height))?;
        std::thread::sleep(Duration::from_millis(100));
    }

    // Degenerate orientations are rejected and leave the previous one in place.
    if let Err(e) = world.set_listener_orientation(Vec3::Y, Vec3::Y * 2.0) {
        println!("rejected listener orientation: {}", e);
    }

    world.destroy(handle)?;
    engine.stop()?;
    world.reclaim();
    println!("objects still allocated: {}", world.object_count());
    Ok(())
}
