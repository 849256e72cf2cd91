//! Queued settings changes and what happens when they cannot be allocated.

use shoal_compute::{ComputeBackend, SoftwareBackend};
use shoal_engine::{FluidWorld, WorldError};
use shoal_test_utils::{fill_interior, small_settings};

#[test]
fn settings_take_effect_only_when_applied() {
    let mut world = FluidWorld::with_software(small_settings(8));
    let t = world.add_tile([0, 0], 0.0, None).unwrap();
    world.set_settings(small_settings(16));
    assert_eq!(world.settings().resolution, [8, 8]);
    assert_eq!(world.pending_settings().map(|s| s.resolution), Some([16, 16]));

    world.advance(0.0).unwrap();
    assert_eq!(world.settings().resolution, [16, 16]);
    assert!(world.pending_settings().is_none());
    assert_eq!(world.tile(t).unwrap().config().resolution, [16, 16]);
}

#[test]
fn oversized_settings_keep_the_old_tiles_alive() {
    let backend = SoftwareBackend::new().with_budget(200_000);
    let mut world = FluidWorld::new(small_settings(8), backend);
    let t = world.add_tile([0, 0], 0.0, None).unwrap();
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 0.5);
    let bytes = world.backend().allocated_bytes();
    let count = world.backend().allocation_count();

    world.set_settings(small_settings(512));
    let err = world.advance(0.25).unwrap_err();
    assert!(matches!(err, WorldError::Grid(_)), "{err}");

    assert_eq!(world.settings().resolution, [8, 8]);
    assert!(world.pending_settings().is_none());
    assert_eq!(world.tile(t).unwrap().config().resolution, [8, 8]);
    assert_eq!(world.backend().allocated_bytes(), bytes);
    assert_eq!(world.backend().allocation_count(), count);

    // The world keeps stepping on its old buffers.
    let m = world.advance(0.25).unwrap();
    assert_eq!(m.steps_run, 1);
    world.advance(0.25).unwrap();
    let p = world.tile(t).unwrap().bounds().center();
    assert_eq!(world.height_at(p), Some(0.5));
}

#[test]
fn failure_on_a_later_tile_returns_the_earlier_allocations() {
    // Two 8x8 tiles plus one 16x16 grid fit; a second 16x16 grid does not.
    let backend = SoftwareBackend::new().with_budget(60_000);
    let mut world = FluidWorld::new(small_settings(8), backend);
    let a = world.add_tile([0, 0], 0.0, None).unwrap();
    let b = world.add_tile([1, 0], 0.0, None).unwrap();
    let bytes = world.backend().allocated_bytes();

    world.set_settings(small_settings(16));
    assert!(world.advance(0.25).is_err());
    assert_eq!(world.backend().allocated_bytes(), bytes);
    for t in [a, b] {
        assert_eq!(world.tile(t).unwrap().config().resolution, [8, 8]);
    }
    assert_eq!(world.settings().resolution, [8, 8]);
}
