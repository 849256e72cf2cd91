//! Grid configuration and clamping.

use glam::Vec2;
use shoal_core::WorldBounds;

/// Shape and placement of one simulation tile.
///
/// Out-of-range values are clamped by [`GridConfig::sanitized`] rather
/// than rejected; each clamp is logged at `warn` level.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    /// Interior cell count along x and z.
    pub resolution: [u32; 2],
    /// Ghost cells added on every side for boundary exchange.
    pub ghost_margin: u32,
    /// Cells beyond the interior exposed to renderers. Never larger than
    /// `ghost_margin`.
    pub render_margin: u32,
    /// Fluid layers (1 or 2).
    pub layers: u32,
    /// World-space size of the interior along x and z.
    pub dimension: Vec2,
    /// World-space centre of the tile on the x/z plane.
    pub center: Vec2,
    /// World-space Y the tile's local heights are relative to.
    pub world_y: f32,
    /// Distance field downsample factor, or `None` to disable the field.
    pub distance_downsample: Option<u32>,
}

impl GridConfig {
    /// Smallest supported resolution per axis.
    pub const MIN_RESOLUTION: u32 = 4;
    /// Largest supported resolution per axis.
    pub const MAX_RESOLUTION: u32 = 4096;
    /// Largest supported ghost margin.
    pub const MAX_GHOST_MARGIN: u32 = 8;
    /// Largest supported distance field downsample factor.
    pub const MAX_DOWNSAMPLE: u32 = 16;

    /// A square, single-layer tile centred on the origin.
    pub fn new(resolution: u32, dimension: f32) -> Self {
        Self {
            resolution: [resolution, resolution],
            ghost_margin: 2,
            render_margin: 1,
            layers: 1,
            dimension: Vec2::splat(dimension),
            center: Vec2::ZERO,
            world_y: 0.0,
            distance_downsample: None,
        }
    }

    /// Return a copy with every field clamped to its supported range.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        for (axis, r) in out.resolution.iter_mut().enumerate() {
            let clamped = (*r).clamp(Self::MIN_RESOLUTION, Self::MAX_RESOLUTION);
            if clamped != *r {
                log::warn!(
                    "grid resolution axis {axis} clamped from {} to {clamped}",
                    *r
                );
                *r = clamped;
            }
        }
        let ghost = out.ghost_margin.clamp(1, Self::MAX_GHOST_MARGIN);
        if ghost != out.ghost_margin {
            log::warn!("ghost margin clamped from {} to {ghost}", out.ghost_margin);
            out.ghost_margin = ghost;
        }
        if out.render_margin > out.ghost_margin {
            log::warn!(
                "render margin {} exceeds ghost margin; clamped to {}",
                out.render_margin,
                out.ghost_margin
            );
            out.render_margin = out.ghost_margin;
        }
        let layers = out.layers.clamp(1, 2);
        if layers != out.layers {
            log::warn!("layer count clamped from {} to {layers}", out.layers);
            out.layers = layers;
        }
        let dim_ok = |v: f32| v.is_finite() && v > 0.0;
        if !dim_ok(out.dimension.x) || !dim_ok(out.dimension.y) {
            log::warn!("non-positive tile dimension {:?}; using 1.0", out.dimension);
            out.dimension = Vec2::new(
                if dim_ok(out.dimension.x) { out.dimension.x } else { 1.0 },
                if dim_ok(out.dimension.y) { out.dimension.y } else { 1.0 },
            );
        }
        if !out.center.is_finite() {
            out.center = Vec2::ZERO;
        }
        if !out.world_y.is_finite() {
            out.world_y = 0.0;
        }
        if let Some(d) = out.distance_downsample {
            let clamped = d.clamp(1, Self::MAX_DOWNSAMPLE);
            if clamped != d {
                log::warn!("distance downsample clamped from {d} to {clamped}");
            }
            out.distance_downsample = Some(clamped);
        }
        out
    }

    /// Buffer size including ghost cells: `resolution + 2 * ghost_margin`.
    pub fn padded(&self) -> [u32; 2] {
        [
            self.resolution[0] + 2 * self.ghost_margin,
            self.resolution[1] + 2 * self.ghost_margin,
        ]
    }

    /// Total padded cell count.
    pub fn padded_cells(&self) -> usize {
        let [w, h] = self.padded();
        w as usize * h as usize
    }

    /// World-space size of one cell.
    pub fn cell_size(&self) -> Vec2 {
        self.dimension / Vec2::new(self.resolution[0] as f32, self.resolution[1] as f32)
    }

    /// World bounds of the interior.
    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::from_center_size(self.center, self.dimension)
    }

    /// World bounds of the whole padded buffer.
    pub fn padded_bounds(&self) -> WorldBounds {
        self.bounds()
            .expanded(self.cell_size() * self.ghost_margin as f32)
    }

    /// World position of the centre of padded cell `(x, y)`.
    pub fn cell_center(&self, x: u32, y: u32) -> Vec2 {
        let origin = self.padded_bounds().min;
        origin + (Vec2::new(x as f32, y as f32) + 0.5) * self.cell_size()
    }

    /// Padded-space cell containing world point `p`, restricted to the
    /// interior. `None` outside the tile bounds.
    pub fn world_to_cell(&self, p: Vec2) -> Option<[u32; 2]> {
        let bounds = self.bounds();
        if !bounds.contains(p) {
            return None;
        }
        let local = (p - bounds.min) / self.cell_size();
        let x = (local.x.floor() as u32).min(self.resolution[0] - 1);
        let y = (local.y.floor() as u32).min(self.resolution[1] - 1);
        Some([x + self.ghost_margin, y + self.ghost_margin])
    }

    /// Whether padded cell `(x, y)` is an interior (non-ghost) cell.
    pub fn is_interior(&self, x: u32, y: u32) -> bool {
        let g = self.ghost_margin;
        x >= g && y >= g && x < g + self.resolution[0] && y < g + self.resolution[1]
    }

    /// Distance field resolution, if enabled.
    pub fn distance_resolution(&self) -> Option<[u32; 2]> {
        self.distance_downsample.map(|d| {
            [
                (self.resolution[0] / d).max(1),
                (self.resolution[1] / d).max(1),
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_is_clamped_not_rejected() {
        let mut c = GridConfig::new(2, 10.0);
        c.resolution = [2, 10_000];
        let s = c.sanitized();
        assert_eq!(s.resolution, [GridConfig::MIN_RESOLUTION, GridConfig::MAX_RESOLUTION]);
    }

    #[test]
    fn render_margin_never_exceeds_ghost() {
        let mut c = GridConfig::new(16, 10.0);
        c.ghost_margin = 2;
        c.render_margin = 5;
        assert_eq!(c.sanitized().render_margin, 2);
    }

    #[test]
    fn layers_and_dimension_are_repaired() {
        let mut c = GridConfig::new(16, 10.0);
        c.layers = 7;
        c.dimension = Vec2::new(f32::NAN, -3.0);
        let s = c.sanitized();
        assert_eq!(s.layers, 2);
        assert_eq!(s.dimension, Vec2::ONE);
    }

    #[test]
    fn padded_geometry() {
        let c = GridConfig::new(8, 16.0);
        assert_eq!(c.padded(), [12, 12]);
        assert_eq!(c.cell_size(), Vec2::splat(2.0));
        let pb = c.padded_bounds();
        assert_eq!(pb.min, Vec2::splat(-12.0));
        assert_eq!(pb.max, Vec2::splat(12.0));
    }

    #[test]
    fn world_to_cell_maps_interior_only() {
        let c = GridConfig::new(4, 4.0);
        // Interior spans [-2, 2); ghost margin 2 shifts indices by 2.
        assert_eq!(c.world_to_cell(Vec2::new(-1.5, -1.5)), Some([2, 2]));
        assert_eq!(c.world_to_cell(Vec2::new(1.9, 0.1)), Some([5, 4]));
        assert_eq!(c.world_to_cell(Vec2::new(2.0, 0.0)), None);
        assert_eq!(c.cell_center(2, 2), Vec2::new(-1.5, -1.5));
        assert!(c.is_interior(5, 5));
        assert!(!c.is_interior(6, 5));
    }

    #[test]
    fn distance_resolution_follows_downsample() {
        let mut c = GridConfig::new(64, 10.0);
        assert_eq!(c.distance_resolution(), None);
        c.distance_downsample = Some(4);
        assert_eq!(c.distance_resolution(), Some([16, 16]));
    }
}
