//! Test utilities and mock solvers for Shoal development.
//!
//! Provides solver fixtures (see [`fixtures`]) and helpers that build
//! small worlds with one cell per world unit, so expected positions and
//! volumes can be written down by hand.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{ConstSolver, FailingSolver, IdentitySolver};

use std::sync::Arc;

use glam::Vec2;
use shoal_compute::SoftwareBackend;
use shoal_core::{TileId, WorldBounds};
use shoal_engine::{FluidWorld, Settings};
use shoal_grid::{SimulationGrid, Terrain};

/// Settings for a `res`-by-`res` tile of `res` world units, so every
/// cell is one unit wide.
///
/// Steps are a quarter second, at most four per frame, readback runs in
/// a single band and the distance field is off.
pub fn small_settings(res: u32) -> Settings {
    let mut s = Settings {
        resolution: [res, res],
        dimension: [res as f32, res as f32],
        step_duration: 0.25,
        max_steps_per_frame: 4,
        ..Settings::default()
    };
    s.readback.timeslices = 1;
    s.distance_field.enabled = false;
    s
}

/// A world with one tile at the lattice origin, on the software backend.
pub fn single_tile_world(settings: Settings) -> (FluidWorld, TileId) {
    let mut world = FluidWorld::with_software(settings);
    let tile = world.add_tile([0, 0], 0.0, None).expect("tile allocation");
    (world, tile)
}

/// A world with two tiles side by side: `a` at the origin and `b` on
/// its right.
pub fn two_tile_world(settings: Settings) -> (FluidWorld, TileId, TileId) {
    let mut world = FluidWorld::with_software(settings);
    let a = world.add_tile([0, 0], 0.0, None).expect("tile allocation");
    let b = world.add_tile([1, 0], 0.0, None).expect("tile allocation");
    (world, a, b)
}

/// Same as [`two_tile_world`] with a custom solver.
pub fn two_tile_world_with(
    settings: Settings,
    solver: impl shoal_engine::Solver + 'static,
) -> (FluidWorld, TileId, TileId) {
    let (world, a, b) = two_tile_world(settings);
    let world = world.with_solver(shoal_engine::SimulationKind::ShallowWater, Box::new(solver));
    (world, a, b)
}

/// A flat terrain at height `y` covering `bounds`.
pub fn flat_terrain(bounds: WorldBounds, y: f32) -> Arc<Terrain> {
    Arc::new(Terrain::flat(bounds, y))
}

/// Terrain sloping along x: height is `slope * x` in world space.
pub fn ramp_terrain(bounds: WorldBounds, slope: f32) -> Arc<Terrain> {
    let size = bounds.size();
    let min = bounds.min;
    let texture = shoal_core::Texture::from_fn(64, 1, move |u, _| slope * (min.x + u * size.x));
    Arc::new(Terrain::new(shoal_grid::TerrainSource::Heightmap(texture), bounds))
}

/// Set the first-layer depth of every interior cell.
pub fn fill_interior(grid: &mut SimulationGrid, depth: f32) {
    let g = grid.ghost_margin();
    let [rx, ry] = grid.config().resolution;
    let buf = grid.height.active_mut();
    for y in g..g + ry {
        for x in g..g + rx {
            buf.set(x, y, 0, depth);
        }
    }
}

/// Centre of interior cell `(ix, iy)` (zero-based, ghosts excluded).
pub fn interior_center(grid: &SimulationGrid, ix: u32, iy: u32) -> Vec2 {
    let g = grid.ghost_margin();
    grid.cell_center(ix + g, iy + g)
}

/// Drive `world` with fixed frames of one step each until every tile's
/// surface mirror is complete, or `max_frames` pass. Returns the frames
/// used.
pub fn settle_readback(world: &mut FluidWorld, max_frames: usize) -> usize {
    let dt = world.settings().step_duration;
    for frame in 0..max_frames {
        if world
            .tiles()
            .all(|t| t.surface_mirror().is_some_and(|m| m.is_complete()))
        {
            return frame;
        }
        world.advance(dt).expect("advance");
    }
    max_frames
}

/// A bare software backend with `latency` frames of readback delay.
pub fn backend_with_latency(latency: u32) -> SoftwareBackend {
    SoftwareBackend::new().with_latency(latency)
}
