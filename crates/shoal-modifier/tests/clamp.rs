//! Minimum and Maximum never move depth the wrong way.

use glam::Vec2;
use proptest::prelude::*;
use shoal_compute::{CommandStream, KernelTable, Kernels, SoftwareBackend};
use shoal_core::FluidLayer;
use shoal_grid::{GridConfig, SimulationGrid};
use shoal_modifier::{apply_phase, BlendMode, HeightSpace, Modifier, ModifierRegistry, Phase};

fn snapshot(grid: &SimulationGrid) -> Vec<f32> {
    grid.height.active().data().to_vec()
}

proptest! {
    #[test]
    fn clamps_are_monotonic(
        heights in proptest::collection::vec(0.0f32..10.0, 64),
        terrain in proptest::collection::vec(-2.0f32..4.0, 64),
        world_y in -5.0f32..5.0,
        strength in -5.0f32..15.0,
        falloff in 0.25f32..4.0,
        local in any::<bool>(),
        maximum in any::<bool>(),
    ) {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut config = GridConfig::new(8, 8.0);
        config.world_y = world_y;
        let mut grid = SimulationGrid::init(&config, &mut backend).unwrap();
        let g = config.ghost_margin;
        for y in 0..8 {
            for x in 0..8 {
                let i = (y * 8 + x) as usize;
                grid.height.active_mut().set(x + g, y + g, 0, heights[i]);
                grid.terrain.active_mut().set(x + g, y + g, 0, terrain[i]);
            }
        }

        let space = if local { HeightSpace::LocalHeight } else { HeightSpace::WorldHeight };
        let blend = if maximum { BlendMode::Maximum } else { BlendMode::Minimum };
        let mut reg = ModifierRegistry::new();
        reg.register(
            Modifier::source(Vec2::ZERO, Vec2::splat(6.0), strength)
                .with_blend(blend)
                .with_falloff(falloff)
                .with_target(FluidLayer::Primary, space),
        );

        let before = snapshot(&grid);
        let mut stream = CommandStream::new(&mut backend, &kernels);
        let stats = apply_phase(&reg, Phase::Post, &mut grid, 0.1, &mut stream);
        prop_assert_eq!(stats.applied, 1);
        let after = snapshot(&grid);

        for (b, a) in before.iter().zip(&after) {
            if maximum {
                prop_assert!(a >= b, "maximum lowered {} to {}", b, a);
            } else {
                prop_assert!(a <= b, "minimum raised {} to {}", b, a);
            }
            prop_assert!(*a >= 0.0);
        }
    }
}
