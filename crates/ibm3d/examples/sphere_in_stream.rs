//! Sphere in a uniform stream
//!
//! Couples one heavy sphere to a background field that starts as a uniform
//! stream. The field "solver" here is a stand-in: every step the velocity is
//! reset to the stream and nudged by a fraction of the body force, so the
//! coupling can be watched without a projection step.
//!
//! Writes marker dumps and a body trajectory to `target/sphere_in_stream/`.
//!
//! Run with: cargo run --example sphere_in_stream --release [scenario.yaml]

use ibm3d::diagnostics::write_marker_dump;
use ibm3d::{BodyTrajectory, ImmersedBoundary3D, ScenarioConfig};
use std::path::PathBuf;

/// Fraction of `dt * force` the stand-in field update adds to the stream
const FLUID_RESPONSE: f32 = 0.05;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| manifest.join("scenarios/sphere_in_stream.yaml"));

    let scenario = if path.exists() {
        log::info!("Loading scenario {}", path.display());
        ScenarioConfig::load_yaml(&path)?
    } else {
        log::warn!("{} not found, using the default scenario", path.display());
        ScenarioConfig::default()
    };

    let mut ib = ImmersedBoundary3D::from_scenario(&scenario)?;
    let mut velocity = scenario.field.build(3)?;
    let mut force = scenario.field.build(3)?;
    velocity.fill_vector(0, scenario.background_velocity);

    let out_dir = manifest.join("../../target/sphere_in_stream");
    std::fs::create_dir_all(&out_dir)?;
    let mut trajectory = BodyTrajectory::new();
    trajectory.record(0, 0.0, &ib.bodies);

    println!(
        "{}: {} bodies, {} markers, {} steps of {}",
        scenario.name,
        ib.body_count(),
        ib.marker_count(),
        scenario.steps,
        scenario.dt
    );

    let mut time = 0.0f32;
    for _ in 0..scenario.steps {
        if let Err(e) = ib.step(&velocity, &mut force, scenario.dt) {
            log::error!("Step {} failed: {}", ib.step_count + 1, e);
            break;
        }
        time += scenario.dt;
        trajectory.record(ib.step_count, time, &ib.bodies);

        // Stand-in field update
        let bg = scenario.background_velocity;
        let response = FLUID_RESPONSE * scenario.dt;
        for a in 0..3 {
            let f = force.channel(a).to_vec();
            for (u, f) in velocity.channel_mut(a).iter_mut().zip(f) {
                *u = bg[a] + response * f;
            }
        }

        if scenario.dump_every > 0 && ib.step_count % scenario.dump_every as u64 == 0 {
            let dump = write_marker_dump(&out_dir, &ib.markers, ib.step_count)?;
            log::info!("Step {}: dumped markers to {}", ib.step_count, dump.display());
        }

        for (id, body) in ib.bodies.iter() {
            println!(
                "step {:4}  body {}  x = {:.5} {:.5} {:.5}  v = {:.4} {:.4} {:.4}",
                ib.step_count,
                id.0,
                body.location.x,
                body.location.y,
                body.location.z,
                body.velocity.x,
                body.velocity.y,
                body.velocity.z
            );
        }
    }

    let trajectory_path = out_dir.join("trajectory.jsonl");
    trajectory.write_json_lines(&trajectory_path)?;
    println!("Trajectory written to {}", trajectory_path.display());

    Ok(())
}
