//! Static input baking for stationary sources.

use shoal_compute::{workgroups, CommandStream};
use shoal_grid::SimulationGrid;

use crate::inject::cell_region;
use crate::model::ModifierKind;
use crate::registry::ModifierRegistry;

/// Rebuild `grid.static_input` from the registry's stationary additive
/// sources. Returns how many were baked.
///
/// The buffer holds depth per second per layer; [`apply_static`] adds it
/// every step.
pub fn bake_static(
    registry: &ModifierRegistry,
    grid: &mut SimulationGrid,
    stream: &mut CommandStream<'_>,
) -> usize {
    grid.static_input.fill(0.0);
    let kernel = stream.kernels().static_bake;
    let mut baked = 0;
    for (id, m) in registry.statics() {
        if let Some(reason) = m.skip_reason() {
            log::debug!("static modifier {id} skipped: {reason}");
            continue;
        }
        let ModifierKind::Source { layer, .. } = m.kind else {
            continue;
        };
        let li = layer.index() as u32;
        if li >= grid.layers() {
            log::debug!("static modifier {id} skipped: tile has no {layer:?} layer");
            continue;
        }
        let Some((xs, ys)) = cell_region(grid.config(), &m.bounds()) else {
            continue;
        };
        let config = grid.config().clone();
        let target = &mut grid.static_input;
        stream.dispatch(kernel, workgroups(xs.len() as u32, ys.len() as u32), || {
            for y in ys {
                for x in xs.clone() {
                    let w = m.weight_at(config.cell_center(x, y));
                    if w > 0.0 {
                        let v = target.get(x, y, li) + m.strength * w;
                        target.set(x, y, li, v);
                    }
                }
            }
        });
        baked += 1;
    }
    log::debug!("baked {baked} static source(s)");
    baked
}

/// Add `static_input * dt` to the active height field.
///
/// Depths are not clamped here; the pre-phase resolve clamps after all
/// additive writes.
pub fn apply_static(grid: &mut SimulationGrid, dt: f32, stream: &mut CommandStream<'_>) {
    let [w, h] = grid.padded();
    let kernel = stream.kernels().static_apply;
    let input = &grid.static_input;
    let height = grid.height.active_mut();
    stream.dispatch(kernel, workgroups(w, h), || {
        for (d, s) in height.data_mut().iter_mut().zip(input.data()) {
            *d += s * dt;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::apply_phase;
    use crate::model::{Modifier, Phase};
    use glam::Vec2;
    use shoal_compute::{KernelTable, Kernels, SoftwareBackend};
    use shoal_grid::GridConfig;

    #[test]
    fn static_sources_bake_once_and_apply_every_step() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut grid = SimulationGrid::init(&GridConfig::new(4, 4.0), &mut backend).unwrap();
        let mut reg = ModifierRegistry::new();
        reg.register(Modifier::source(Vec2::new(-1.5, -1.5), Vec2::splat(2.0), 3.0).stationary());
        // A dynamic source is not baked.
        reg.register(Modifier::source(Vec2::new(1.5, 1.5), Vec2::splat(2.0), 3.0));

        let mut stream = CommandStream::new(&mut backend, &kernels);
        assert_eq!(bake_static(&reg, &mut grid, &mut stream), 1);
        assert_eq!(grid.static_input.get(2, 2, 0), 3.0);
        assert_eq!(grid.static_input.get(5, 5, 0), 0.0);

        for _ in 0..4 {
            apply_phase(&reg, Phase::Pre, &mut grid, 0.25, &mut stream);
        }
        assert_eq!(grid.height.active().get(2, 2, 0), 3.0);
        assert_eq!(grid.height.active().get(5, 5, 0), 3.0);
        drop(stream);
        assert_eq!(backend.dispatch_count(kernels.static_bake), 1);
        assert_eq!(backend.dispatch_count(kernels.static_apply), 4);
    }
}
