//! Modifier phases and solver failure through a whole world.

use std::sync::atomic::Ordering;

use glam::Vec2;
use shoal_core::FluidLayer;
use shoal_modifier::{BlendMode, HeightSpace, Modifier};
use shoal_engine::{FluidWorld, SimulationKind};
use shoal_test_utils::{
    fill_interior, interior_center, small_settings, FailingSolver, IdentitySolver,
};

#[test]
fn set_world_height_lands_exactly_on_target() {
    let mut world = FluidWorld::with_software(small_settings(8))
        .with_solver(SimulationKind::ShallowWater, Box::new(IdentitySolver));
    let t = world.add_tile([0, 0], 2.0, None).unwrap();
    let p = interior_center(world.tile(t).unwrap().grid(), 3, 3);
    world.modifiers_mut().register(
        Modifier::source(p, Vec2::splat(2.0), 5.0)
            .with_blend(BlendMode::Set)
            .with_target(FluidLayer::Primary, HeightSpace::WorldHeight),
    );
    world.advance(0.25).unwrap();
    world.advance(0.25).unwrap();

    let tile = world.tile(t).unwrap();
    assert_eq!(tile.height_at(p), Some(5.0));
    assert_eq!(tile.depth_at(p), Some(3.0));
    assert_eq!(tile.layer_at(p), Some(FluidLayer::Primary));
}

#[test]
fn static_source_adds_rate_times_step() {
    let mut world = FluidWorld::with_software(small_settings(8))
        .with_solver(SimulationKind::ShallowWater, Box::new(IdentitySolver));
    let t = world.add_tile([0, 0], 0.0, None).unwrap();
    let grid = world.tile(t).unwrap().grid();
    let p = interior_center(grid, 4, 4);
    let [x, y] = grid.world_to_cell(p).unwrap();
    world
        .modifiers_mut()
        .register(Modifier::source(p, Vec2::splat(2.0), 4.0).stationary());

    let m = world.advance(0.25).unwrap();
    assert_eq!(m.injection.applied, 0);
    let depth = world.tile(t).unwrap().grid().height.active().get(x, y, 0);
    assert_eq!(depth, 1.0);

    world.advance(0.5).unwrap();
    let depth = world.tile(t).unwrap().grid().height.active().get(x, y, 0);
    assert_eq!(depth, 3.0);
}

#[test]
fn minimum_clamp_caps_depth() {
    let mut world = FluidWorld::with_software(small_settings(8));
    let t = world.add_tile([0, 0], 0.0, None).unwrap();
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 3.0);
    let center = world.tile(t).unwrap().bounds().center();
    world.modifiers_mut().register(
        Modifier::source(center, Vec2::splat(100.0), 1.0)
            .with_blend(BlendMode::Minimum)
            .with_shape(shoal_modifier::ModifierShape::Box)
            .with_falloff(1e-6),
    );
    let m = world.advance(0.25).unwrap();
    assert_eq!(m.injection.applied, 1);
    let grid = world.tile(t).unwrap().grid();
    let g = grid.ghost_margin();
    let v = grid.height.active().get(g + 4, g + 4, 0);
    assert!(v <= 1.0 + 1e-4, "minimum clamp not applied: {v}");
}

#[test]
fn failed_solver_step_keeps_previous_state() {
    let solver = FailingSolver::new(1);
    let calls = solver.calls();
    let mut world = FluidWorld::with_software(small_settings(4))
        .with_solver(SimulationKind::Wave, Box::new(solver));
    let t = world.add_tile([0, 0], 0.0, None).unwrap();
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 1.5);

    let m = world.advance(0.5).unwrap();
    assert_eq!(m.steps_run, 2);
    assert_eq!(m.solver_failures, 1);
    assert_eq!(calls.load(Ordering::Relaxed), 2);

    let grid = world.tile(t).unwrap().grid();
    let g = grid.ghost_margin();
    assert_eq!(grid.height.active().get(g + 1, g + 1, 0), 1.5);
    assert_eq!(world.kind(), SimulationKind::Wave);
}

#[test]
fn idle_solver_evaporates_each_step() {
    let mut settings = small_settings(4);
    settings.evaporation = [0.4, 0.0];
    let mut world = FluidWorld::with_software(settings);
    let t = world.add_tile([0, 0], 0.0, None).unwrap();
    fill_interior(world.tile_mut(t).unwrap().grid_mut(), 1.0);
    world.advance(0.5).unwrap();
    let grid = world.tile(t).unwrap().grid();
    let g = grid.ghost_margin();
    assert!((grid.height.active().get(g, g, 0) - 0.8).abs() < 1e-6);
}
