//! One tile of a fluid world.
//!
//! [`Simulation`] owns a tile's [`SimulationGrid`], its terrain, and the
//! host mirrors that answer CPU queries. The world drives it through a
//! fixed per-frame order:
//!
//! ```text
//!   prepare      obstacles? -> terrain? -> statics?
//!   per step     [exchange] -> Pre inject -> solve -> swap -> Post inject -> [exchange]
//!   derive       composite -> normals -> jump flood
//!   readback     request next band of each mirror
//! ```
//!
//! Exchange is a world operation spanning tiles, so it sits outside
//! this type.

use std::sync::Arc;

use glam::Vec2;
use shoal_compute::{CommandStream, ComputeBackend};
use shoal_core::{PackedCell, TileId, WorldBounds};
use shoal_grid::{GridConfig, GridError, ObstacleSet, ResetMask, SimulationGrid, Terrain, TerrainInput};
use shoal_modifier::{apply_phase, bake_static, InjectStats, ModifierRegistry, Phase};
use shoal_readback::{HostMirror, JumpFlood, MirrorPipeline};

use crate::config::Settings;
use crate::solver::{SolveContext, Solver};

/// Readback counters gathered by one receive pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReceiveCounts {
    pub completed: u64,
    pub failed: u64,
    pub stale: u64,
}

impl ReceiveCounts {
    fn since(self, before: Self) -> Self {
        Self {
            completed: self.completed - before.completed,
            failed: self.failed - before.failed,
            stale: self.stale - before.stale,
        }
    }
}

/// A single simulated tile.
pub struct Simulation {
    id: TileId,
    grid: SimulationGrid,
    terrain: Option<Arc<Terrain>>,
    terrain_input: Option<TerrainInput>,
    terrain_dirty: bool,
    baked_static: Option<u64>,
    surface: Option<MirrorPipeline<PackedCell>>,
    distance: Option<MirrorPipeline<[f32; 2]>>,
}

impl Simulation {
    pub(crate) fn new(
        id: TileId,
        config: &GridConfig,
        terrain: Option<Arc<Terrain>>,
        settings: &Settings,
        backend: &mut dyn ComputeBackend,
    ) -> Result<Self, GridError> {
        let grid = SimulationGrid::init(config, backend)?;
        let terrain_input = terrain.as_deref().map(Terrain::to_input);
        let mut sim = Self {
            id,
            grid,
            terrain,
            terrain_input,
            terrain_dirty: true,
            baked_static: None,
            surface: None,
            distance: None,
        };
        sim.rebuild_pipelines(settings);
        Ok(sim)
    }

    /// Tile ID.
    pub fn id(&self) -> TileId {
        self.id
    }

    /// The tile's buffers.
    pub fn grid(&self) -> &SimulationGrid {
        &self.grid
    }

    /// Mutable access to the tile's buffers, for solvers and tests
    /// driving a tile by hand.
    pub fn grid_mut(&mut self) -> &mut SimulationGrid {
        &mut self.grid
    }

    /// Grid configuration in effect.
    pub fn config(&self) -> &GridConfig {
        self.grid.config()
    }

    /// Interior world bounds.
    pub fn bounds(&self) -> WorldBounds {
        self.grid.bounds()
    }

    /// World Y the tile's heights are relative to.
    pub fn world_y(&self) -> f32 {
        self.grid.config().world_y
    }

    /// Terrain shared with this tile, if any.
    pub fn terrain(&self) -> Option<&Arc<Terrain>> {
        self.terrain.as_ref()
    }

    /// Replace the terrain. The heightfield is rebaked on the next frame;
    /// clearing it bakes a flat floor at the tile's world Y.
    pub fn set_terrain(&mut self, terrain: Option<Arc<Terrain>>) {
        self.terrain_input = Some(match terrain.as_deref() {
            Some(t) => t.to_input(),
            None => Terrain::flat(self.grid.config().padded_bounds(), self.world_y()).to_input(),
        });
        self.terrain = terrain;
        self.terrain_dirty = true;
    }

    /// Host copy of the composite field, if readback is enabled.
    pub fn surface_mirror(&self) -> Option<&HostMirror<PackedCell>> {
        self.surface.as_ref().map(MirrorPipeline::mirror)
    }

    /// Host copy of the nearest-fluid seeds, if the distance field is
    /// enabled.
    pub fn distance_mirror(&self) -> Option<&HostMirror<[f32; 2]>> {
        self.distance.as_ref().map(MirrorPipeline::mirror)
    }

    /// Surface readback pipeline, if enabled.
    pub fn surface_pipeline(&self) -> Option<&MirrorPipeline<PackedCell>> {
        self.surface.as_ref()
    }

    /// Distance readback pipeline, if enabled.
    pub fn distance_pipeline(&self) -> Option<&MirrorPipeline<[f32; 2]>> {
        self.distance.as_ref()
    }

    /// Whether any readback is still awaiting completion.
    pub fn readback_pending(&self) -> bool {
        self.surface.as_ref().is_some_and(MirrorPipeline::is_pending)
            || self.distance.as_ref().is_some_and(MirrorPipeline::is_pending)
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Install a grid already allocated for new settings, releasing the
    /// old one. Mirrors restart empty and any completion still in flight
    /// is dropped as stale.
    ///
    /// Allocation happens before this call so a world can reallocate
    /// every tile first and only swap once all of them succeeded.
    pub(crate) fn replace_grid(
        &mut self,
        grid: SimulationGrid,
        settings: &Settings,
        backend: &mut dyn ComputeBackend,
    ) {
        let mut old = std::mem::replace(&mut self.grid, grid);
        old.release(backend);
        self.terrain_dirty = true;
        self.baked_static = None;
        self.rebuild_pipelines(settings);
    }

    fn rebuild_pipelines(&mut self, settings: &Settings) {
        let [w, h] = self.grid.padded();
        self.surface = if settings.readback.enabled {
            match self.surface.take() {
                Some(mut p) => {
                    p.invalidate(w, h, settings.readback.timeslices);
                    Some(p)
                }
                None => Some(MirrorPipeline::new(self.id, w, h, settings.readback.timeslices)),
            }
        } else {
            None
        };
        let slices = settings.distance_field.timeslices;
        self.distance = match (self.grid.config().distance_resolution(), self.distance.take()) {
            (Some([dw, dh]), Some(mut p)) => {
                p.invalidate(dw, dh, slices);
                Some(p)
            }
            (Some([dw, dh]), None) => Some(MirrorPipeline::new(self.id, dw, dh, slices)),
            (None, _) => None,
        };
    }

    /// Return every device allocation. The tile must not be used again.
    pub(crate) fn release(&mut self, backend: &mut dyn ComputeBackend) {
        self.grid.release(backend);
    }

    // ── Frame stages ────────────────────────────────────────────

    /// Refresh derived inputs that changed since the last frame.
    pub(crate) fn prepare(
        &mut self,
        registry: &ModifierRegistry,
        obstacles: &ObstacleSet,
        obstacles_changed: bool,
        stream: &mut CommandStream<'_>,
    ) {
        if obstacles_changed || self.terrain_dirty {
            self.grid.draw_obstacles(obstacles, stream);
        }
        if self.terrain_dirty {
            self.grid.bake_terrain(self.terrain_input.as_ref(), stream);
            self.terrain_dirty = false;
            log::debug!("{} terrain baked", self.id);
        }
        let revision = registry.static_revision();
        if self.baked_static != Some(revision) {
            let baked = bake_static(registry, &mut self.grid, stream);
            self.baked_static = Some(revision);
            log::debug!("{} baked {baked} static source(s)", self.id);
        }
    }

    /// Apply one phase of modifiers.
    pub(crate) fn inject(
        &mut self,
        registry: &ModifierRegistry,
        phase: Phase,
        dt: f32,
        stream: &mut CommandStream<'_>,
    ) -> InjectStats {
        apply_phase(registry, phase, &mut self.grid, dt, stream)
    }

    /// Run the solver and swap on success. A failed step leaves the
    /// tile's state untouched.
    pub(crate) fn solve(&mut self, solver: &mut dyn Solver, ctx: &mut SolveContext<'_, '_>) -> bool {
        match solver.solve(&mut self.grid, ctx) {
            Ok(()) => {
                self.grid.swap();
                true
            }
            Err(e) => {
                log::warn!("{} {} skipped step {}: {e}", self.id, solver.name(), ctx.step());
                false
            }
        }
    }

    /// Rebuild the render and query fields from the current state.
    pub(crate) fn derive(&mut self, jump_flood: &JumpFlood, stream: &mut CommandStream<'_>) {
        self.grid.pack_composite(stream);
        self.grid.compute_normals(stream);
        if self.distance.is_some() {
            jump_flood.run(&mut self.grid, stream);
        }
    }

    /// Reinitialize the active height field.
    pub(crate) fn reset(&mut self, uniform: f32, mask: Option<&ResetMask>, stream: &mut CommandStream<'_>) {
        self.grid.reset(uniform, mask, stream);
        self.grid.pack_composite(stream);
    }

    // ── Readback ────────────────────────────────────────────────

    /// Issue the next band of each enabled mirror. Returns what already
    /// completed, which is only ever non-zero on a synchronous backend.
    pub(crate) fn request_readbacks(&mut self, backend: &mut dyn ComputeBackend) -> ReceiveCounts {
        let before = self.readback_totals();
        if let Some(p) = self.surface.as_mut() {
            p.request(self.grid.composite_current().data(), backend);
        }
        if let (Some(p), Some(seeds)) = (self.distance.as_mut(), self.grid.distance.as_ref()) {
            p.request(seeds.active().data(), backend);
        }
        self.readback_totals().since(before)
    }

    /// Copy every delivered completion into the mirrors.
    pub(crate) fn receive_readbacks(&mut self) -> ReceiveCounts {
        let before = self.readback_totals();
        if let Some(p) = self.surface.as_mut() {
            p.receive();
        }
        if let Some(p) = self.distance.as_mut() {
            p.receive();
        }
        self.readback_totals().since(before)
    }

    fn readback_totals(&self) -> ReceiveCounts {
        let mut out = ReceiveCounts::default();
        let stats = self
            .surface
            .iter()
            .map(MirrorPipeline::stats)
            .chain(self.distance.iter().map(MirrorPipeline::stats));
        for s in stats {
            out.completed += s.completed;
            out.failed += s.failed;
            out.stale += s.stale;
        }
        out
    }

    /// World-space centre of this tile for a given lattice coordinate.
    pub(crate) fn center_of(coord: [i32; 2], tile_size: Vec2) -> Vec2 {
        Vec2::new(coord[0] as f32, coord[1] as f32) * tile_size
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("id", &self.id)
            .field("bounds", &self.bounds())
            .field("terrain", &self.terrain.is_some())
            .field("readback_pending", &self.readback_pending())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_compute::{KernelTable, Kernels, SoftwareBackend};
    use shoal_modifier::Modifier;

    fn small_settings() -> Settings {
        Settings {
            resolution: [8, 8],
            dimension: [8.0, 8.0],
            ..Settings::default()
        }
    }

    #[test]
    fn static_sources_rebake_only_on_revision_change() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let settings = small_settings();
        let config = settings.grid_config(Vec2::ZERO, 0.0);
        let terrain = Arc::new(Terrain::flat(config.padded_bounds(), -1.0));
        let mut sim =
            Simulation::new(TileId(0), &config, Some(terrain), &settings, &mut backend).unwrap();
        let mut registry = ModifierRegistry::new();
        let obstacles = ObstacleSet::new();
        registry.register(Modifier::source(Vec2::ZERO, Vec2::splat(2.0), 1.0).stationary());

        for _ in 0..3 {
            let mut stream = CommandStream::new(&mut backend, &kernels);
            sim.prepare(&registry, &obstacles, false, &mut stream);
        }
        assert_eq!(backend.dispatch_count(kernels.terrain_bake), 1);
        assert_eq!(backend.dispatch_count(kernels.static_bake), 1);

        registry.register(Modifier::source(Vec2::ONE, Vec2::ONE, 1.0).stationary());
        let mut stream = CommandStream::new(&mut backend, &kernels);
        sim.prepare(&registry, &obstacles, false, &mut stream);
        drop(stream);
        assert!(backend.dispatch_count(kernels.static_bake) > 1);
    }

    #[test]
    fn disabled_readback_has_no_mirrors() {
        let mut backend = SoftwareBackend::new();
        let mut settings = small_settings();
        settings.readback.enabled = false;
        let config = settings.grid_config(Vec2::ZERO, 0.0);
        let sim = Simulation::new(TileId(3), &config, None, &settings, &mut backend).unwrap();
        assert!(sim.surface_mirror().is_none());
        assert!(sim.distance_mirror().is_none());
        assert!(!sim.readback_pending());
    }

    #[test]
    fn replaced_grid_resizes_mirrors() {
        let mut backend = SoftwareBackend::new();
        let mut settings = small_settings();
        settings.distance_field.enabled = true;
        settings.distance_field.downsample = 2;
        let config = settings.grid_config(Vec2::ZERO, 0.0);
        let mut sim = Simulation::new(TileId(1), &config, None, &settings, &mut backend).unwrap();
        assert_eq!(sim.distance_mirror().unwrap().width(), 4);

        settings.resolution = [16, 16];
        let config = settings.grid_config(Vec2::ZERO, 0.0);
        let grid = SimulationGrid::init(&config, &mut backend).unwrap();
        sim.replace_grid(grid, &settings, &mut backend);
        let surface = sim.surface_mirror().unwrap();
        assert_eq!(surface.width(), 16 + 2 * config.ghost_margin);
        assert_eq!(sim.distance_mirror().unwrap().width(), 8);
    }
}
