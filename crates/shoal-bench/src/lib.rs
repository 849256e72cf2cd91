//! Benchmark profiles for the Shoal fluid simulation.
//!
//! - [`reference_settings`]: 128x128 tiles, readback in 4 bands
//! - [`stress_settings`]: 512x512 tiles with the distance field enabled
//! - [`populate`]: a square cluster of tiles with a ring of sources

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use glam::Vec2;
use shoal_core::TileId;
use shoal_engine::{FluidWorld, Settings, WorldError};
use shoal_modifier::{BlendMode, Modifier};

/// 128x128 cells per 64-unit tile, 60 Hz steps, readback in 4 bands.
pub fn reference_settings() -> Settings {
    let mut s = Settings {
        resolution: [128, 128],
        dimension: [64.0, 64.0],
        step_duration: 1.0 / 60.0,
        max_steps_per_frame: 1,
        ..Settings::default()
    };
    s.readback.timeslices = 4;
    s
}

/// 512x512 cells per tile with the distance field at quarter resolution.
pub fn stress_settings() -> Settings {
    let mut s = reference_settings();
    s.resolution = [512, 512];
    s.dimension = [128.0, 128.0];
    s.distance_field.enabled = true;
    s.distance_field.downsample = 4;
    s.readback.timeslices = 8;
    s
}

/// Fill `world` with a `side` x `side` block of linked tiles and
/// `sources` additive sources spread on a ring through the cluster,
/// plus one Set drain at its centre.
pub fn populate(
    world: &mut FluidWorld,
    side: i32,
    sources: usize,
) -> Result<Vec<TileId>, WorldError> {
    let mut tiles = Vec::new();
    for y in 0..side {
        for x in 0..side {
            tiles.push(world.add_tile([x, y], 0.0, None)?);
        }
    }
    let size = world.settings().tile_size();
    let center = (Vec2::splat(side as f32) - 1.0) * 0.5 * size;
    let radius = side as f32 * size.x * 0.3;
    for i in 0..sources {
        let angle = i as f32 / sources.max(1) as f32 * std::f32::consts::TAU;
        let p = center + Vec2::from_angle(angle) * radius;
        world
            .modifiers_mut()
            .register(Modifier::source(p, size * 0.1, 2.0));
    }
    world.modifiers_mut().register(
        Modifier::source(center, size * 0.05, 0.0).with_blend(BlendMode::Set),
    );
    Ok(tiles)
}
