//! Height fields saved and restored through the world.

use shoal_core::TileId;
use shoal_engine::WorldError;
use shoal_test_utils::{fill_interior, single_tile_world, small_settings};

fn scratch(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("shoal-world-{}-{name}.shlh", std::process::id()))
}

#[test]
fn save_then_load_restores_depths() {
    let path = scratch("roundtrip");
    let (mut world, t) = single_tile_world(small_settings(8));
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 0.75);
    world.save_height(t, &path).unwrap();

    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 0.0);
    world.load_height(t, &path).unwrap();
    let grid = world.tile(t).unwrap().grid();
    let g = grid.ghost_margin();
    assert_eq!(grid.height.active().get(g + 2, g + 5, 0), 0.75);
    std::fs::remove_file(&path).ok();
}

#[test]
fn loading_into_a_different_shape_fails() {
    let path = scratch("shape");
    let (world, t) = single_tile_world(small_settings(8));
    world.save_height(t, &path).unwrap();

    let (mut other, u) = single_tile_world(small_settings(16));
    let err = other.load_height(u, &path).unwrap_err();
    assert!(matches!(err, WorldError::Grid(_)), "{err}");
    std::fs::remove_file(&path).ok();
}

#[test]
fn missing_tile_is_reported() {
    let (world, _) = single_tile_world(small_settings(4));
    let err = world.save_height(TileId(42), scratch("missing")).unwrap_err();
    assert_eq!(err.to_string(), "unknown tile tile#42");
}
