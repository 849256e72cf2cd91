//! Host mirrors and CPU queries through a whole world.

use shoal_compute::{Capabilities, ComputeBackend, SoftwareBackend};
use shoal_engine::{FluidWorld, SimulationKind};
use shoal_test_utils::{
    fill_interior, interior_center, settle_readback, single_tile_world, small_settings,
    IdentitySolver,
};

#[test]
fn queries_wait_for_the_first_completion() {
    let (mut world, t) = single_tile_world(small_settings(8));
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 0.5);
    let p = world.tile(t).unwrap().bounds().center();
    assert_eq!(world.height_at(p), None);

    world.advance(0.25).unwrap();
    // Requested this frame, delivered no earlier than the next.
    assert_eq!(world.height_at(p), None);

    world.advance(0.25).unwrap();
    assert_eq!(world.tile(t).unwrap().depth_at(p), Some(0.5));
    assert_eq!(world.height_at(p), Some(0.5));
}

#[test]
fn synchronous_backend_answers_queries_after_one_frame() {
    let backend = SoftwareBackend::new().with_capabilities(Capabilities {
        async_readback: false,
        float_blend: true,
    });
    let mut world = FluidWorld::new(small_settings(8), backend);
    let t = world.add_tile([0, 0], 0.0, None).unwrap();
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 0.5);
    let p = world.tile(t).unwrap().bounds().center();

    let m = world.advance(0.25).unwrap();
    assert_eq!(m.readbacks_completed, 1);
    assert_eq!(world.backend().pending_readbacks(), 0);
    assert!(!world.tile(t).unwrap().readback_pending());
    assert_eq!(world.height_at(p), Some(0.5));
}

#[test]
fn timesliced_mirror_fills_one_band_per_frame() {
    let mut settings = small_settings(8);
    settings.readback.timeslices = 4;
    let (mut world, t) = single_tile_world(settings);
    let frames = settle_readback(&mut world, 50);
    assert_eq!(frames, 5);
    let stats = world.tile(t).unwrap().surface_pipeline().unwrap().stats();
    assert_eq!(stats.completed, 4);
}

#[test]
fn points_outside_every_tile_return_none() {
    let (mut world, _) = single_tile_world(small_settings(8));
    settle_readback(&mut world, 10);
    assert_eq!(world.height_at(glam::Vec2::new(100.0, 0.0)), None);
    assert_eq!(world.nearest_fluid(glam::Vec2::new(100.0, 0.0)), None);
}

#[test]
fn nearest_fluid_finds_the_only_wet_cell() {
    let mut settings = small_settings(8);
    settings.distance_field.enabled = true;
    settings.distance_field.downsample = 1;
    settings.distance_field.timeslices = 1;
    let mut world = FluidWorld::with_software(settings)
        .with_solver(SimulationKind::ShallowWater, Box::new(IdentitySolver));
    let t = world.add_tile([0, 0], 0.0, None).unwrap();
    let grid = world.tile(t).unwrap().grid();
    let wet = interior_center(grid, 1, 6);
    let query = interior_center(grid, 7, 0);
    let [x, y] = grid.world_to_cell(wet).unwrap();
    world.tile_mut(t).unwrap().grid_mut().height.active_mut().set(x, y, 0, 1.0);

    assert_eq!(world.nearest_fluid(query), None);
    world.advance(0.25).unwrap();
    world.advance(0.25).unwrap();
    assert_eq!(world.nearest_fluid(query), Some(wet));
    assert_eq!(world.nearest_fluid(wet), Some(wet));
}

#[test]
fn failed_readback_is_retried_without_losing_data() {
    let (mut world, t) = single_tile_world(small_settings(8));
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 0.25);
    let p = world.tile(t).unwrap().bounds().center();
    world.advance(0.25).unwrap();
    world.backend_mut().fail_next_readbacks(1);

    let m = world.advance(0.25).unwrap();
    assert_eq!(m.readbacks_failed, 1);
    assert_eq!(world.height_at(p), None);

    let m = world.advance(0.25).unwrap();
    assert_eq!(m.readbacks_completed, 1);
    assert_eq!(world.height_at(p), Some(0.25));
}

#[test]
fn normals_point_up_on_a_flat_surface() {
    let (mut world, t) = single_tile_world(small_settings(8));
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 1.0);
    settle_readback(&mut world, 10);
    let p = interior_center(world.tile(t).unwrap().grid(), 4, 4);
    assert_eq!(world.tile(t).unwrap().normal_at(p), Some(glam::Vec3::Y));
}

#[test]
fn teardown_drains_in_flight_readbacks() {
    let mut settings = small_settings(8);
    settings.readback.timeslices = 3;
    let (mut world, _) = single_tile_world(settings);
    world.advance(0.25).unwrap();
    assert!(world.backend().pending_readbacks() > 0 || world.tiles().any(|t| t.readback_pending()));
    let backend = world.teardown();
    assert_eq!(backend.allocation_count(), 0);
}
