//! Renderer-facing outputs: the composite field and normals.

use glam::{Vec2, Vec3};
use shoal_compute::{workgroups, CommandStream};
use shoal_core::{PackedCell, UvTransform};

use crate::buffer::PackedField;
use crate::grid::SimulationGrid;

impl SimulationGrid {
    /// Pack terrain, depth and velocity into the composite field.
    ///
    /// The new cells are written into the buffer holding the older
    /// composite, then the pair is swapped: afterwards `composite.active()`
    /// is the current frame and `composite.next()` the previous one.
    pub fn pack_composite(&mut self, stream: &mut CommandStream<'_>) {
        let [w, h] = self.padded();
        let height = self.height.active();
        let velocity = self.velocity.active();
        let terrain = self.terrain.active();
        let target = self.composite.next_mut();
        let kernel = stream.kernels().pack_composite;
        stream.dispatch(kernel, workgroups(w, h), || {
            for y in 0..h {
                for x in 0..w {
                    let layers = height.cell(x, y);
                    let depths = [layers[0], layers.get(1).copied().unwrap_or(0.0)];
                    let v = velocity.cell(x, y);
                    let cell = PackedCell::compose(
                        terrain.get(x, y, 0),
                        depths,
                        Vec2::new(v[0], v[1]),
                    );
                    target.set(x, y, 0, cell);
                }
            }
        });
        self.composite.swap();
    }

    /// Derive surface normals from terrain plus total depth with central
    /// differences, clamped at the buffer edge.
    pub fn compute_normals(&mut self, stream: &mut CommandStream<'_>) {
        let [w, h] = self.padded();
        let cell = self.config().cell_size();
        let height = self.height.active();
        let terrain = self.terrain.active();
        let normals = &mut self.normals;
        let surface = |x: u32, y: u32| -> f32 {
            terrain.get(x, y, 0) + height.cell(x, y).iter().sum::<f32>()
        };
        let kernel = stream.kernels().normals;
        stream.dispatch(kernel, workgroups(w, h), || {
            for y in 0..h {
                for x in 0..w {
                    let (x0, x1) = (x.saturating_sub(1), (x + 1).min(w - 1));
                    let (y0, y1) = (y.saturating_sub(1), (y + 1).min(h - 1));
                    let dx = (surface(x1, y) - surface(x0, y)) / ((x1 - x0).max(1) as f32 * cell.x);
                    let dz = (surface(x, y1) - surface(x, y0)) / ((y1 - y0).max(1) as f32 * cell.y);
                    let n = Vec3::new(-dx, 1.0, -dz).normalize_or(Vec3::Y);
                    normals.cell_mut(x, y).copy_from_slice(&n.to_array());
                }
            }
        });
    }

    /// Current composite (this frame).
    pub fn composite_current(&self) -> &PackedField {
        self.composite.active()
    }

    /// Previous composite (last frame).
    pub fn composite_previous(&self) -> &PackedField {
        self.composite.next()
    }

    /// UV transform from render-region UV (interior plus render margin)
    /// to padded-buffer UV.
    pub fn render_uv_transform(&self) -> UvTransform {
        let config = self.config();
        let g = config.ghost_margin as f32;
        let r = config.render_margin as f32;
        let [pw, ph] = config.padded();
        let [rw, rh] = config.resolution;
        UvTransform {
            scale: Vec2::new(
                (rw as f32 + 2.0 * r) / pw as f32,
                (rh as f32 + 2.0 * r) / ph as f32,
            ),
            offset: Vec2::new((g - r) / pw as f32, (g - r) / ph as f32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use shoal_compute::{KernelTable, Kernels, SoftwareBackend};
    use shoal_core::FluidLayer;

    fn setup(layers: u32) -> (SoftwareBackend, Kernels, SimulationGrid) {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut cfg = GridConfig::new(4, 4.0);
        cfg.layers = layers;
        let grid = SimulationGrid::init(&cfg, &mut backend).unwrap();
        (backend, kernels, grid)
    }

    #[test]
    fn composite_keeps_previous_frame() {
        let (mut backend, kernels, mut grid) = setup(2);
        grid.terrain.active_mut().fill(1.0);
        grid.height.active_mut().set(3, 3, 0, 0.5);
        let mut stream = CommandStream::new(&mut backend, &kernels);
        grid.pack_composite(&mut stream);
        grid.height.active_mut().set(3, 3, 1, 2.0);
        grid.pack_composite(&mut stream);

        let prev = grid.composite_previous().get(3, 3, 0).decode(0.0);
        assert_eq!(prev.height, 1.5);
        assert_eq!(prev.dominant_layer(), FluidLayer::Primary);
        let cur = grid.composite_current().get(3, 3, 0);
        assert_eq!(cur.decode(0.0).height, 3.5);
        assert_eq!(cur.dominant_layer(), FluidLayer::Secondary);
    }

    #[test]
    fn flat_surface_has_up_normals() {
        let (mut backend, kernels, mut grid) = setup(1);
        grid.height.active_mut().fill(1.0);
        let mut stream = CommandStream::new(&mut backend, &kernels);
        grid.compute_normals(&mut stream);
        assert_eq!(grid.normals.cell(4, 4), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn slope_tilts_normal_against_gradient() {
        let (mut backend, kernels, mut grid) = setup(1);
        let [w, h] = grid.padded();
        for y in 0..h {
            for x in 0..w {
                grid.terrain.active_mut().set(x, y, 0, x as f32);
            }
        }
        let mut stream = CommandStream::new(&mut backend, &kernels);
        grid.compute_normals(&mut stream);
        let n = grid.normals.cell(4, 4);
        assert!(n[0] < 0.0);
        assert_eq!(n[2], 0.0);
    }

    #[test]
    fn render_transform_spans_render_region() {
        let (_, _, grid) = setup(1);
        // 4 interior, ghost 2, render 1: padded 8, render region 6 starting at 1.
        let t = grid.render_uv_transform();
        assert_eq!(t.apply(Vec2::ZERO), Vec2::splat(0.125));
        assert_eq!(t.apply(Vec2::ONE), Vec2::splat(0.875));
    }
}
