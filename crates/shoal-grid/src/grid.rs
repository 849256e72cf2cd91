//! [`SimulationGrid`]: per-tile buffer ownership and lifecycle.

use glam::Vec2;
use shoal_compute::{workgroups, BackendError, BufferHandle, CommandStream, ComputeBackend};
use shoal_core::{Texture, UvTransform, WorldBounds};

use crate::buffer::{FieldBuffer, GridBuffer, PackedField, SeedField};
use crate::config::GridConfig;
use crate::error::GridError;
use crate::pingpong::PingPong;

/// Channels in the velocity field (x, z).
pub const VELOCITY_CHANNELS: u32 = 2;

/// Channels in the normal field (x, y, z).
pub const NORMAL_CHANNELS: u32 = 3;

/// Optional mask for [`SimulationGrid::reset`].
///
/// The mask is sampled across the tile's interior bounds; each cell's
/// first layer becomes `max(uniform, texture * scale)`.
#[derive(Clone, Debug)]
pub struct ResetMask {
    /// Mask texture, channel 0 is read.
    pub texture: Texture,
    /// Multiplier applied to the sampled value.
    pub scale: f32,
    /// Transform applied to the tile UV before sampling.
    pub uv: UvTransform,
}

impl ResetMask {
    fn sample(&self, uv: Vec2) -> f32 {
        self.texture.sample(self.uv.apply(uv), 0) * self.scale
    }
}

/// All buffers for one simulation tile.
///
/// Height buffers hold per-layer fluid depth above terrain. Terrain and
/// obstacle buffers hold heights relative to the tile's world Y.
#[derive(Debug)]
pub struct SimulationGrid {
    config: GridConfig,
    /// Per-layer fluid depth.
    pub height: PingPong<FieldBuffer>,
    /// Horizontal velocity (x, z).
    pub velocity: PingPong<FieldBuffer>,
    /// Terrain height relative to world Y.
    pub terrain: PingPong<FieldBuffer>,
    /// Obstacle top height relative to world Y; 0 where free.
    pub obstacle: PingPong<FieldBuffer>,
    /// Composite render field; active is current, next is previous.
    pub composite: PingPong<PackedField>,
    /// Surface normals.
    pub normals: FieldBuffer,
    /// Baked static sources, as depth per second per layer.
    pub static_input: FieldBuffer,
    /// Additive injection accumulator, present only when the backend
    /// lacks float blending. Layout: one channel per layer, then x/z.
    pub injection: Option<FieldBuffer>,
    /// Jump-flood seed pair at distance-field resolution.
    pub distance: Option<PingPong<SeedField>>,
}

/// Tracks handles during a multi-buffer allocation so a failure part-way
/// returns everything allocated so far.
struct Allocation<'a> {
    backend: &'a mut dyn ComputeBackend,
    handles: Vec<BufferHandle>,
}

impl Allocation<'_> {
    fn buffer<T: Copy + Default>(
        &mut self,
        label: String,
        size: [u32; 2],
        channels: u32,
    ) -> Result<GridBuffer<T>, BackendError> {
        let buffer = GridBuffer::allocate(&mut *self.backend, label, size[0], size[1], channels)?;
        if let Some(h) = buffer.handle() {
            self.handles.push(h);
        }
        Ok(buffer)
    }

    fn pair<T: Copy + Default>(
        &mut self,
        label: &str,
        size: [u32; 2],
        channels: u32,
    ) -> Result<PingPong<GridBuffer<T>>, BackendError> {
        let a = self.buffer(format!("{label}.a"), size, channels)?;
        let b = self.buffer(format!("{label}.b"), size, channels)?;
        Ok(PingPong::new(a, b))
    }

    fn rollback(self) {
        for h in self.handles {
            self.backend.release(h);
        }
    }
}

impl SimulationGrid {
    /// Allocate every buffer for `config`.
    ///
    /// The configuration is sanitized first, so out-of-range sizes are
    /// clamped. The only failure is backend memory exhaustion, in which
    /// case nothing stays allocated.
    pub fn init(config: &GridConfig, backend: &mut dyn ComputeBackend) -> Result<Self, GridError> {
        let config = config.sanitized();
        let float_blend = backend.capabilities().float_blend;
        let mut alloc = Allocation {
            backend,
            handles: Vec::new(),
        };
        match Self::build(&config, float_blend, &mut alloc) {
            Ok(grid) => {
                log::info!(
                    "grid init {}x{} (ghost {}, {} layer(s), {} buffers)",
                    config.resolution[0],
                    config.resolution[1],
                    config.ghost_margin,
                    config.layers,
                    alloc.handles.len()
                );
                Ok(grid)
            }
            Err(e) => {
                alloc.rollback();
                Err(e.into())
            }
        }
    }

    fn build(
        config: &GridConfig,
        float_blend: bool,
        alloc: &mut Allocation<'_>,
    ) -> Result<Self, BackendError> {
        let padded = config.padded();
        let layers = config.layers;
        let injection = if float_blend {
            None
        } else {
            Some(alloc.buffer("injection".into(), padded, layers + VELOCITY_CHANNELS)?)
        };
        let distance = match config.distance_resolution() {
            Some(size) => Some(alloc.pair("distance", size, 1)?),
            None => None,
        };
        let mut grid = Self {
            height: alloc.pair("height", padded, layers)?,
            velocity: alloc.pair("velocity", padded, VELOCITY_CHANNELS)?,
            terrain: alloc.pair("terrain", padded, 1)?,
            obstacle: alloc.pair("obstacle", padded, 1)?,
            composite: alloc.pair("composite", padded, 1)?,
            normals: alloc.buffer("normals".into(), padded, NORMAL_CHANNELS)?,
            static_input: alloc.buffer("static_input".into(), padded, layers)?,
            injection,
            distance,
            config: config.clone(),
        };
        grid.clear_seeds();
        Ok(grid)
    }

    /// Reallocate for a new configuration.
    ///
    /// The new buffers are allocated before the old ones are released, so
    /// peak usage is briefly the sum of both. On failure the grid keeps
    /// its old buffers and configuration untouched.
    pub fn reconfigure(
        &mut self,
        config: &GridConfig,
        backend: &mut dyn ComputeBackend,
    ) -> Result<(), GridError> {
        let fresh = Self::init(config, backend)?;
        self.release(backend);
        log::info!(
            "grid reconfigured to {}x{}",
            fresh.config.resolution[0],
            fresh.config.resolution[1]
        );
        *self = fresh;
        Ok(())
    }

    /// Return every device allocation.
    pub fn release(&mut self, backend: &mut dyn ComputeBackend) {
        for pair in [
            &mut self.height,
            &mut self.velocity,
            &mut self.terrain,
            &mut self.obstacle,
        ] {
            let (a, b) = pair.both_mut();
            a.release(backend);
            b.release(backend);
        }
        let (a, b) = self.composite.both_mut();
        a.release(backend);
        b.release(backend);
        self.normals.release(backend);
        self.static_input.release(backend);
        if let Some(inj) = self.injection.as_mut() {
            inj.release(backend);
        }
        if let Some(dist) = self.distance.as_mut() {
            let (a, b) = dist.both_mut();
            a.release(backend);
            b.release(backend);
        }
    }

    /// Exchange active and next for the height and velocity fields.
    ///
    /// Call only after every command of the current step that reads the
    /// old buffers has been issued.
    pub fn swap(&mut self) {
        self.height.swap();
        self.velocity.swap();
    }

    /// Reinitialize the active height field.
    ///
    /// The first layer becomes `max(uniform, mask)` per cell, any second
    /// layer is emptied, and velocity is zeroed. The next height buffer
    /// receives a copy so the following step starts from the same state.
    pub fn reset(&mut self, uniform: f32, mask: Option<&ResetMask>, stream: &mut CommandStream<'_>) {
        let [w, h] = self.config.padded();
        let config = &self.config;
        let bounds = config.bounds();
        let height = &mut self.height;
        let velocity = &mut self.velocity;
        let kernel = stream.kernels().reset;
        stream.dispatch(kernel, workgroups(w, h), || {
            let buf = height.active_mut();
            for y in 0..h {
                for x in 0..w {
                    let mut value = uniform;
                    if let Some(mask) = mask {
                        value = value.max(mask.sample(bounds.to_uv(config.cell_center(x, y))));
                    }
                    let cell = buf.cell_mut(x, y);
                    cell.fill(0.0);
                    cell[0] = value.max(0.0);
                }
            }
            let (va, vn) = velocity.both_mut();
            va.fill(0.0);
            vn.fill(0.0);
        });
        let (active, next) = self.height.both_mut();
        stream.blit(active.data(), next.data_mut());
    }

    /// Reset every distance seed to "no fluid found".
    pub fn clear_seeds(&mut self) {
        if let Some(dist) = self.distance.as_mut() {
            let (a, b) = dist.both_mut();
            a.fill([f32::NAN; 2]);
            b.fill([f32::NAN; 2]);
        }
    }

    /// The sanitized configuration this grid was allocated for.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Interior bounds in world space.
    pub fn bounds(&self) -> WorldBounds {
        self.config.bounds()
    }

    /// Padded buffer size.
    pub fn padded(&self) -> [u32; 2] {
        self.config.padded()
    }

    /// Ghost margin in cells.
    pub fn ghost_margin(&self) -> u32 {
        self.config.ghost_margin
    }

    /// Number of fluid layers.
    pub fn layers(&self) -> u32 {
        self.config.layers
    }

    /// Padded-space cell for a world point, `None` outside the interior.
    pub fn world_to_cell(&self, p: Vec2) -> Option<[u32; 2]> {
        self.config.world_to_cell(p)
    }

    /// World position of padded cell `(x, y)`.
    pub fn cell_center(&self, x: u32, y: u32) -> Vec2 {
        self.config.cell_center(x, y)
    }

    /// Fluid depth summed over layers at padded cell `(x, y)`.
    pub fn total_depth(&self, x: u32, y: u32) -> f32 {
        self.height.active().cell(x, y).iter().sum()
    }

    /// Sum of fluid depth over interior cells, times cell area.
    pub fn volume(&self) -> f32 {
        let g = self.config.ghost_margin;
        let [rw, rh] = self.config.resolution;
        let area = self.config.cell_size().x * self.config.cell_size().y;
        let mut sum = 0.0;
        for y in g..g + rh {
            for x in g..g + rw {
                sum += self.total_depth(x, y);
            }
        }
        sum * area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_compute::{Capabilities, KernelTable, Kernels, SoftwareBackend};

    #[test]
    fn init_allocates_padded_buffers() {
        let mut backend = SoftwareBackend::new();
        let grid = SimulationGrid::init(&GridConfig::new(8, 8.0), &mut backend).unwrap();
        assert_eq!(grid.height.active().shape(), (12, 12, 1));
        assert_eq!(grid.velocity.next().shape(), (12, 12, 2));
        assert_eq!(grid.normals.channels(), 3);
        assert!(grid.injection.is_none());
        assert!(grid.distance.is_none());
        assert!(backend.allocation_count() > 0);
    }

    #[test]
    fn init_clamps_small_resolution() {
        let mut backend = SoftwareBackend::new();
        let grid = SimulationGrid::init(&GridConfig::new(1, 8.0), &mut backend).unwrap();
        assert_eq!(grid.config().resolution, [4, 4]);
    }

    #[test]
    fn exhaustion_is_reported_and_rolled_back() {
        let mut backend = SoftwareBackend::new().with_budget(2_000);
        let err = SimulationGrid::init(&GridConfig::new(16, 8.0), &mut backend).unwrap_err();
        assert!(matches!(err, GridError::Backend(BackendError::OutOfMemory { .. })));
        assert_eq!(backend.allocated_bytes(), 0);
    }

    #[test]
    fn missing_float_blend_adds_injection_buffer() {
        let mut backend = SoftwareBackend::new().with_capabilities(Capabilities {
            async_readback: true,
            float_blend: false,
        });
        let mut cfg = GridConfig::new(8, 8.0);
        cfg.layers = 2;
        let grid = SimulationGrid::init(&cfg, &mut backend).unwrap();
        assert_eq!(grid.injection.as_ref().map(|b| b.channels()), Some(4));
    }

    #[test]
    fn swap_flips_height_and_velocity_only() {
        let mut backend = SoftwareBackend::new();
        let mut grid = SimulationGrid::init(&GridConfig::new(4, 4.0), &mut backend).unwrap();
        grid.height.next_mut().set(3, 3, 0, 2.0);
        grid.terrain.next_mut().set(3, 3, 0, 9.0);
        grid.swap();
        assert_eq!(grid.height.active().get(3, 3, 0), 2.0);
        assert_eq!(grid.terrain.active().get(3, 3, 0), 0.0);
    }

    #[test]
    fn reset_takes_max_of_uniform_and_mask() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut grid = SimulationGrid::init(&GridConfig::new(4, 4.0), &mut backend).unwrap();
        grid.velocity.active_mut().fill(3.0);
        // Left half of the mask is 0, right half is 4.
        let mask = ResetMask {
            texture: Texture::from_data(2, 1, 1, vec![0.0, 4.0]).unwrap(),
            scale: 1.0,
            uv: UvTransform::IDENTITY,
        };
        {
            let mut stream = CommandStream::new(&mut backend, &kernels);
            grid.reset(1.0, Some(&mask), &mut stream);
        }
        let h = grid.height.active();
        assert_eq!(h.get(2, 2, 0), 1.0);
        assert_eq!(h.get(5, 2, 0), 4.0);
        assert_eq!(grid.height.next().get(5, 2, 0), 4.0);
        assert!(grid.velocity.active().data().iter().all(|&v| v == 0.0));
        assert_eq!(backend.dispatch_count(kernels.reset), 1);
    }

    #[test]
    fn reconfigure_reallocates() {
        let mut backend = SoftwareBackend::new();
        let mut grid = SimulationGrid::init(&GridConfig::new(4, 4.0), &mut backend).unwrap();
        let before = backend.allocated_bytes();
        grid.reconfigure(&GridConfig::new(8, 4.0), &mut backend).unwrap();
        assert_eq!(grid.padded(), [12, 12]);
        assert!(backend.allocated_bytes() > before);
        grid.release(&mut backend);
        assert_eq!(backend.allocated_bytes(), 0);
    }

    #[test]
    fn failed_reconfigure_keeps_old_buffers() {
        let mut backend = SoftwareBackend::new().with_budget(64_000);
        let mut grid = SimulationGrid::init(&GridConfig::new(4, 4.0), &mut backend).unwrap();
        grid.height.active_mut().set(3, 3, 0, 1.5);
        let bytes = backend.allocated_bytes();
        let count = backend.allocation_count();

        let err = grid.reconfigure(&GridConfig::new(128, 4.0), &mut backend).unwrap_err();
        assert!(matches!(err, GridError::Backend(BackendError::OutOfMemory { .. })));
        assert_eq!(grid.config().resolution, [4, 4]);
        assert_eq!(grid.height.active().get(3, 3, 0), 1.5);
        assert_eq!(backend.allocated_bytes(), bytes);
        assert_eq!(backend.allocation_count(), count);

        grid.release(&mut backend);
        assert_eq!(backend.allocated_bytes(), 0);
    }

    #[test]
    fn volume_counts_interior_only() {
        let mut backend = SoftwareBackend::new();
        let mut grid = SimulationGrid::init(&GridConfig::new(4, 8.0), &mut backend).unwrap();
        grid.height.active_mut().fill(1.0);
        // 16 interior cells of 2x2 world units each.
        assert_eq!(grid.volume(), 64.0);
    }
}
