//! Shoal Quickstart: two linked tiles, a fountain and a drain.
//!
//! Demonstrates:
//!   1. Building Settings and a FluidWorld on the software backend
//!   2. Adding a tile and growing a neighbour off it
//!   3. Implementing a Solver (depth relaxation between cells)
//!   4. Registering modifiers: an additive fountain and a Set drain
//!   5. Advancing with frame time and querying host mirrors
//!
//! Run with:
//!   RUST_LOG=info cargo run --example quickstart

use glam::Vec2;
use shoal_boundary::BoundarySide;
use shoal_compute::workgroups;
use shoal_core::FluidLayer;
use shoal_engine::{FluidWorld, Settings, SimulationKind, SolveContext, Solver, SolverError};
use shoal_grid::SimulationGrid;
use shoal_modifier::{BlendMode, HeightSpace, Modifier};

// ─── Solver: explicit depth relaxation ──────────────────────────
//
// Each cell moves a fraction of its depth difference towards the
// 4-connected average. Reads the active buffer, writes next, so the
// update is Jacobi style and ghost cells supply the neighbours at tile
// edges.

struct RelaxSolver {
    rate: f32,
}

impl Solver for RelaxSolver {
    fn name(&self) -> &str {
        "relax"
    }

    fn solve(
        &mut self,
        grid: &mut SimulationGrid,
        ctx: &mut SolveContext<'_, '_>,
    ) -> Result<(), SolverError> {
        let [w, h] = grid.padded();
        let k = (self.rate * ctx.dt()).clamp(0.0, 0.25);
        let kernel = ctx.passes().flux;
        let (height, next) = grid.height.split();
        let (velocity, next_velocity) = grid.velocity.split();
        ctx.stream().dispatch(kernel, workgroups(w, h), || {
            for y in 0..h {
                for x in 0..w {
                    let c = height.get(x, y, 0);
                    if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                        next.set(x, y, 0, c);
                        continue;
                    }
                    let sum = height.get(x - 1, y, 0)
                        + height.get(x + 1, y, 0)
                        + height.get(x, y - 1, 0)
                        + height.get(x, y + 1, 0);
                    next.set(x, y, 0, (c + k * (sum - 4.0 * c)).max(0.0));
                }
            }
            next_velocity.data_mut().copy_from_slice(velocity.data());
        });
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Shoal Quickstart ===\n");

    let settings = Settings {
        resolution: [32, 32],
        dimension: [16.0, 16.0],
        step_duration: 1.0 / 30.0,
        ..Settings::default()
    };
    println!(
        "Tiles: {}x{} cells over {}x{} units, step {:.4}s",
        settings.resolution[0],
        settings.resolution[1],
        settings.dimension[0],
        settings.dimension[1],
        settings.step_duration
    );

    let mut world = FluidWorld::with_software(settings)
        .with_solver(SimulationKind::ShallowWater, Box::new(RelaxSolver { rate: 2.0 }));
    let west = world.add_tile([0, 0], 0.0, None)?;
    let east = world.add_neighbor(west, BoundarySide::Right)?;
    println!("Tiles {west} and {east} linked.\n");

    let fountain = Vec2::new(6.0, 0.0);
    let drain = Vec2::new(20.0, 0.0);
    world
        .modifiers_mut()
        .register(Modifier::source(fountain, Vec2::splat(3.0), 6.0));
    world.modifiers_mut().register(
        Modifier::source(drain, Vec2::splat(2.0), 0.0)
            .with_blend(BlendMode::Set)
            .with_target(FluidLayer::Primary, HeightSpace::WorldHeight),
    );

    // 60 Hz frames against a 30 Hz simulation step.
    let points = [fountain, Vec2::new(8.0, 0.0), Vec2::new(12.0, 0.0), drain];
    for frame in 1..=240 {
        let metrics = world.advance(1.0 / 60.0)?;
        if frame % 60 == 0 {
            let depths: Vec<String> = points
                .iter()
                .map(|p| match world.sample(*p) {
                    Some(s) => format!("{:6.3}", s.fluid_depth()),
                    None => "   n/a".into(),
                })
                .collect();
            println!(
                "frame {frame:3}: steps {} dispatches {:3} depths [{}]",
                metrics.steps_run,
                metrics.dispatches,
                depths.join(", ")
            );
        }
    }

    println!("\nResetting {west} to a uniform 0.5...");
    world.reset_tile(west, 0.5, None)?;
    world.advance(1.0 / 30.0)?;
    world.advance(1.0 / 30.0)?;
    if let Some(n) = world.tile(west).and_then(|t| t.normal_at(Vec2::ZERO)) {
        println!("Normal at origin: ({:.3}, {:.3}, {:.3})", n.x, n.y, n.z);
    }

    let backend = world.teardown();
    println!("\nDone. {} allocation(s) left.", backend.allocation_count());
    Ok(())
}
