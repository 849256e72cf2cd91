//! CPU-side surface queries.
//!
//! Every query reads the host mirrors only and never touches device
//! buffers. Each returns `None` when the point is outside the tile, when
//! the relevant readback is disabled, or before the covering rows have
//! arrived.

use glam::{Vec2, Vec3};
use shoal_core::{CellSample, FluidLayer};
use shoal_readback::seed_world;

use crate::simulation::Simulation;

impl Simulation {
    /// Decoded cell under world point `p`.
    pub fn sample(&self, p: Vec2) -> Option<CellSample> {
        let [x, y] = self.grid().world_to_cell(p)?;
        self.sample_cell(x, y)
    }

    fn sample_cell(&self, x: u32, y: u32) -> Option<CellSample> {
        let cell = self.surface_mirror()?.get(x, y)?;
        Some(cell.decode(self.world_y()))
    }

    /// World-space surface height at `p`.
    pub fn height_at(&self, p: Vec2) -> Option<f32> {
        self.sample(p).map(|s| s.height)
    }

    /// Total fluid depth at `p`.
    pub fn depth_at(&self, p: Vec2) -> Option<f32> {
        self.sample(p).map(|s| s.fluid_depth())
    }

    /// Layer holding most of the fluid at `p`.
    pub fn layer_at(&self, p: Vec2) -> Option<FluidLayer> {
        self.sample(p).map(|s| s.dominant_layer())
    }

    /// Horizontal fluid velocity at `p`.
    pub fn velocity_at(&self, p: Vec2) -> Option<Vec2> {
        self.sample(p).map(|s| s.velocity)
    }

    /// Unit surface normal at `p`, by central differences over the
    /// mirrored heights. Needs the rows above and below to have arrived.
    pub fn normal_at(&self, p: Vec2) -> Option<Vec3> {
        let [x, y] = self.grid().world_to_cell(p)?;
        // Interior cells always have at least one ghost cell around them.
        let left = self.sample_cell(x - 1, y)?.height;
        let right = self.sample_cell(x + 1, y)?.height;
        let down = self.sample_cell(x, y - 1)?.height;
        let up = self.sample_cell(x, y + 1)?.height;
        let cell = self.config().cell_size();
        let dx = (right - left) / (2.0 * cell.x);
        let dz = (up - down) / (2.0 * cell.y);
        Vec3::new(-dx, 1.0, -dz).try_normalize()
    }

    /// World position of the wet cell nearest to `p`, from the distance
    /// field. `None` also when the tile holds no fluid at all.
    pub fn nearest_fluid(&self, p: Vec2) -> Option<Vec2> {
        let bounds = self.bounds();
        if !bounds.contains(p) {
            return None;
        }
        let mirror = self.distance_mirror()?;
        let (w, h) = (mirror.width(), mirror.height());
        let uv = bounds.to_uv(p);
        let tx = ((uv.x * w as f32) as u32).min(w - 1);
        let ty = ((uv.y * h as f32) as u32).min(h - 1);
        seed_world(&bounds, mirror.get(tx, ty)?)
    }
}
