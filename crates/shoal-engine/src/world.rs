//! Multi-tile fluid world.
//!
//! [`FluidWorld`] is the primary user-facing API. It owns the compute
//! backend, every tile, the modifier registry, obstacles and the
//! tile topology, and advances them all with one call per rendered
//! frame:
//!
//! ```text
//!   advance(dt)
//!     poll + receive readbacks from earlier frames
//!     apply queued settings (all tiles or none)
//!     clock -> N fixed steps
//!     prepare every tile (obstacles, terrain, static sources)
//!     N x { exchange, Pre inject, solve, swap, Post inject, exchange }
//!     composite, normals, jump flood
//!     request next readback bands
//! ```
//!
//! # Ownership model
//!
//! `FluidWorld` is [`Send`] but not [`Sync`]. All mutating methods take
//! `&mut self`, so queries can never observe a frame half-way through.
//! Readback completions issued in one frame are only received at the
//! start of a later one, unless the backend lacks asynchronous readback,
//! in which case they land before `advance` returns.
//!
//! # Shutdown
//!
//! [`teardown`](FluidWorld::teardown) drains every in-flight readback,
//! releases every tile and hands the backend back.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use indexmap::IndexMap;
use shoal_boundary::{BoundaryExchange, BoundarySide, LatticeCoord, Links, Topology};
use shoal_compute::{CommandStream, ComputeBackend, KernelTable, Kernels, SoftwareBackend};
use shoal_core::{CellSample, FluidLayer, StepId, TileId};
use shoal_grid::{GridConfig, ObstacleSet, ResetMask, SimulationGrid, Terrain};
use shoal_modifier::{ModifierRegistry, Phase};
use shoal_readback::JumpFlood;

use crate::clock::SimulationClock;
use crate::config::Settings;
use crate::error::WorldError;
use crate::kind::{SimulationKind, SolverPasses};
use crate::metrics::FrameMetrics;
use crate::simulation::Simulation;
use crate::solver::{IdleSolver, SolveContext, Solver};

const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<FluidWorld>();
    }
};

/// A set of linked simulation tiles sharing one backend, one clock and
/// one modifier registry.
pub struct FluidWorld<B: ComputeBackend = SoftwareBackend> {
    backend: B,
    kernel_table: KernelTable,
    kernels: Kernels,
    passes: SolverPasses,
    settings: Settings,
    pending_settings: Option<Settings>,
    kind: SimulationKind,
    solver: Box<dyn Solver>,
    clock: SimulationClock,
    topology: Topology,
    exchange: BoundaryExchange,
    tiles: IndexMap<TileId, Simulation>,
    next_tile: u32,
    modifiers: ModifierRegistry,
    obstacles: ObstacleSet,
    jump_flood: JumpFlood,
    step_id: StepId,
    last_metrics: FrameMetrics,
}

impl FluidWorld<SoftwareBackend> {
    /// A world on the host reference backend.
    pub fn with_software(settings: Settings) -> Self {
        Self::new(settings, SoftwareBackend::new())
    }
}

impl<B: ComputeBackend> FluidWorld<B> {
    /// An empty world. Settings are sanitized; every clamp is logged.
    ///
    /// The solver defaults to [`IdleSolver`] running
    /// [`SimulationKind::ShallowWater`] passes.
    pub fn new(settings: Settings, backend: B) -> Self {
        let settings = settings.sanitized();
        let mut kernel_table = KernelTable::new();
        let kernels = Kernels::resolve(&mut kernel_table);
        let kind = SimulationKind::default();
        let passes = kind.resolve_passes(&mut kernel_table);
        log::info!(
            "fluid world on {} backend: {}x{} cells per tile, {} layer(s)",
            backend.name(),
            settings.resolution[0],
            settings.resolution[1],
            settings.layers()
        );
        Self {
            clock: SimulationClock::new(settings.step_duration, settings.max_steps_per_frame),
            exchange: BoundaryExchange::new(settings.open_borders),
            jump_flood: JumpFlood::new(settings.distance_field.max_iterations),
            backend,
            kernel_table,
            kernels,
            passes,
            settings,
            pending_settings: None,
            kind,
            solver: Box::new(IdleSolver),
            topology: Topology::new(),
            tiles: IndexMap::new(),
            next_tile: 0,
            modifiers: ModifierRegistry::new(),
            obstacles: ObstacleSet::new(),
            step_id: StepId::default(),
            last_metrics: FrameMetrics::default(),
        }
    }

    /// Replace the solver and the kind whose passes it runs.
    pub fn with_solver(mut self, kind: SimulationKind, solver: Box<dyn Solver>) -> Self {
        self.set_solver(kind, solver);
        self
    }

    /// Replace the solver and the kind whose passes it runs.
    pub fn set_solver(&mut self, kind: SimulationKind, solver: Box<dyn Solver>) {
        self.passes = kind.resolve_passes(&mut self.kernel_table);
        self.kind = kind;
        log::info!("solver set to {} ({kind:?})", solver.name());
        self.solver = solver;
    }

    // ── Tiles ───────────────────────────────────────────────────

    /// Add a tile at lattice `coord`, linking it to any tile already next
    /// to it. Its centre is `coord` times the tile dimension.
    pub fn add_tile(
        &mut self,
        coord: LatticeCoord,
        world_y: f32,
        terrain: Option<Arc<Terrain>>,
    ) -> Result<TileId, WorldError> {
        let id = TileId(self.next_tile);
        self.topology.insert(id, coord)?;
        self.spawn(id, coord, world_y, terrain)?;
        let links = self.topology.auto_link(id);
        self.log_links(id, &links);
        Ok(id)
    }

    /// Add a tile on `parent`'s `side`, inheriting its terrain and world
    /// Y. The new tile is linked to every tile already around it.
    pub fn add_neighbor(&mut self, parent: TileId, side: BoundarySide) -> Result<TileId, WorldError> {
        let (world_y, terrain) = {
            let p = self.tiles.get(&parent).ok_or(WorldError::UnknownTile(parent))?;
            (p.world_y(), p.terrain().cloned())
        };
        let id = TileId(self.next_tile);
        let links = self.topology.attach(parent, side, id)?;
        let coord = self
            .topology
            .coord(id)
            .ok_or(WorldError::UnknownTile(id))?;
        self.spawn(id, coord, world_y, terrain)?;
        self.log_links(id, &links);
        Ok(id)
    }

    fn spawn(
        &mut self,
        id: TileId,
        coord: LatticeCoord,
        world_y: f32,
        terrain: Option<Arc<Terrain>>,
    ) -> Result<(), WorldError> {
        let center = Simulation::center_of(coord, self.settings.tile_size());
        let config = self.settings.grid_config(center, world_y);
        match Simulation::new(id, &config, terrain, &self.settings, &mut self.backend) {
            Ok(sim) => {
                self.tiles.insert(id, sim);
                self.next_tile += 1;
                Ok(())
            }
            Err(e) => {
                self.topology.remove(id);
                log::error!("{id} allocation failed: {e}");
                Err(e.into())
            }
        }
    }

    fn log_links(&self, id: TileId, links: &Links) {
        for (side, other) in links {
            log::debug!("{id} linked {side:?} to {other}");
        }
        log::info!("{id} added at {:?} with {} link(s)", self.topology.coord(id), links.len());
    }

    /// Remove a tile, draining its readbacks and releasing its buffers.
    /// Returns `false` if no such tile exists.
    pub fn remove_tile(&mut self, id: TileId) -> bool {
        let Some(mut sim) = self.tiles.shift_remove(&id) else {
            return false;
        };
        self.backend.flush();
        sim.receive_readbacks();
        if sim.readback_pending() {
            log::warn!("{id} still had readbacks pending at removal");
        }
        for other in self.tiles.values_mut() {
            other.receive_readbacks();
        }
        sim.release(&mut self.backend);
        self.topology.remove(id);
        self.exchange.forget(id);
        log::info!("{id} removed");
        true
    }

    /// Link `a`'s `side` to `b` explicitly, outside the lattice.
    pub fn link(&mut self, a: TileId, side: BoundarySide, b: TileId) -> Result<(), WorldError> {
        self.topology.link(a, side, b)?;
        Ok(())
    }

    /// Remove the link on `a`'s `side`. Returns the former neighbour.
    pub fn unlink(&mut self, a: TileId, side: BoundarySide) -> Option<TileId> {
        self.topology.unlink(a, side)
    }

    /// Tile lattice and links.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// One tile.
    pub fn tile(&self, id: TileId) -> Option<&Simulation> {
        self.tiles.get(&id)
    }

    /// One tile, mutably.
    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Simulation> {
        self.tiles.get_mut(&id)
    }

    /// Every tile, in insertion order.
    pub fn tiles(&self) -> impl Iterator<Item = &Simulation> {
        self.tiles.values()
    }

    /// Number of tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Replace a tile's terrain. Rebaked on the next frame.
    pub fn set_terrain(&mut self, id: TileId, terrain: Option<Arc<Terrain>>) -> Result<(), WorldError> {
        self.tiles
            .get_mut(&id)
            .ok_or(WorldError::UnknownTile(id))?
            .set_terrain(terrain);
        Ok(())
    }

    /// Reinitialize a tile's fluid to `max(uniform, mask)` in the first
    /// layer, with everything else emptied.
    pub fn reset_tile(
        &mut self,
        id: TileId,
        uniform: f32,
        mask: Option<&ResetMask>,
    ) -> Result<(), WorldError> {
        let sim = self.tiles.get_mut(&id).ok_or(WorldError::UnknownTile(id))?;
        let mut stream = CommandStream::new(&mut self.backend, &self.kernels);
        sim.reset(uniform, mask, &mut stream);
        log::debug!("{id} reset to {uniform}");
        Ok(())
    }

    /// Write a tile's height field to `path`.
    pub fn save_height(&self, id: TileId, path: impl AsRef<Path>) -> Result<(), WorldError> {
        let sim = self.tiles.get(&id).ok_or(WorldError::UnknownTile(id))?;
        sim.grid().save_height(path)?;
        Ok(())
    }

    /// Restore a tile's height field from `path`.
    pub fn load_height(&mut self, id: TileId, path: impl AsRef<Path>) -> Result<(), WorldError> {
        let sim = self.tiles.get_mut(&id).ok_or(WorldError::UnknownTile(id))?;
        sim.grid_mut().load_height(path)?;
        Ok(())
    }

    // ── Settings ────────────────────────────────────────────────

    /// Settings in effect.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings queued by [`set_settings`](Self::set_settings) and not
    /// yet applied.
    pub fn pending_settings(&self) -> Option<&Settings> {
        self.pending_settings.as_ref()
    }

    /// Queue new settings. They are sanitized now and applied at the
    /// start of the next frame; tiles are only reallocated then.
    pub fn set_settings(&mut self, settings: Settings) {
        self.pending_settings = Some(settings.sanitized());
    }

    /// Reallocate every tile for `next`, then commit.
    ///
    /// All new grids are allocated before any old one is released. If
    /// one allocation fails the grids allocated so far are returned, the
    /// old settings and buffers stay in effect, and `next` is dropped.
    fn apply_settings(&mut self, next: Settings) -> Result<(), WorldError> {
        let size = next.tile_size();
        let mut fresh = Vec::with_capacity(self.tiles.len());
        for (id, sim) in &self.tiles {
            let coord = self.topology.coord(*id).unwrap_or_default();
            let config: GridConfig = next.grid_config(Simulation::center_of(coord, size), sim.world_y());
            match SimulationGrid::init(&config, &mut self.backend) {
                Ok(grid) => fresh.push(grid),
                Err(e) => {
                    for mut grid in fresh {
                        grid.release(&mut self.backend);
                    }
                    log::error!("{id} reallocation failed, keeping previous settings: {e}");
                    return Err(e.into());
                }
            }
        }

        for ((id, sim), grid) in self.tiles.iter_mut().zip(fresh) {
            sim.replace_grid(grid, &next, &mut self.backend);
            self.exchange.forget(*id);
        }
        self.clock.reconfigure(next.step_duration, next.max_steps_per_frame);
        self.exchange.set_open_borders(next.open_borders);
        self.jump_flood = JumpFlood::new(next.distance_field.max_iterations);
        self.settings = next;
        log::info!("settings applied to {} tile(s)", self.tiles.len());
        Ok(())
    }

    // ── Frame ───────────────────────────────────────────────────

    /// Advance by `dt` seconds of frame time.
    ///
    /// Runs zero or more fixed steps, then rebuilds the render fields and
    /// issues the next readback bands. Errors only when queued settings
    /// cannot be allocated; the frame is then skipped and the previous
    /// settings stay in effect.
    pub fn advance(&mut self, dt: f32) -> Result<FrameMetrics, WorldError> {
        let frame_start = Instant::now();
        let mut metrics = FrameMetrics::default();

        let readback_start = Instant::now();
        self.backend.poll();
        for sim in self.tiles.values_mut() {
            let counts = sim.receive_readbacks();
            metrics.readbacks_completed += counts.completed;
            metrics.readbacks_failed += counts.failed;
            metrics.readbacks_stale += counts.stale;
        }
        let mut readback_us = readback_start.elapsed().as_micros() as u64;

        if let Some(next) = self.pending_settings.take() {
            self.apply_settings(next)?;
        }

        let steps = self.clock.advance(dt);
        metrics.steps_run = steps.run;
        metrics.steps_dropped = steps.dropped;
        if steps.dropped > 0 {
            log::debug!("frame dropped {} step(s)", steps.dropped);
        }

        let Self {
            backend,
            kernels,
            passes,
            settings,
            kind,
            solver,
            clock,
            topology,
            exchange,
            tiles,
            modifiers,
            obstacles,
            jump_flood,
            step_id,
            ..
        } = self;
        let step_dt = clock.step_duration();
        let physics = [
            settings.layer_physics(FluidLayer::Primary),
            settings.layer_physics(FluidLayer::Secondary),
        ];
        let mut stream = CommandStream::new(&mut *backend, &*kernels);

        let obstacles_changed = obstacles.take_changed();
        for sim in tiles.values_mut() {
            sim.prepare(modifiers, obstacles, obstacles_changed, &mut stream);
        }

        for _ in 0..steps.run {
            *step_id = step_id.next();

            let t = Instant::now();
            exchange_all(exchange, topology, tiles, &mut stream);
            metrics.exchange_us += t.elapsed().as_micros() as u64;

            for sim in tiles.values_mut() {
                let t = Instant::now();
                let mut injected = sim.inject(modifiers, Phase::Pre, step_dt, &mut stream);
                metrics.inject_us += t.elapsed().as_micros() as u64;

                let t = Instant::now();
                let cell_size = sim.config().cell_size() * settings.cell_size_scale;
                let mut ctx = SolveContext {
                    stream: &mut stream,
                    dt: step_dt,
                    step: *step_id,
                    kind: *kind,
                    passes: *passes,
                    physics,
                    cell_size,
                };
                if !sim.solve(&mut **solver, &mut ctx) {
                    metrics.solver_failures += 1;
                }
                metrics.solve_us += t.elapsed().as_micros() as u64;

                let t = Instant::now();
                injected += sim.inject(modifiers, Phase::Post, step_dt, &mut stream);
                metrics.inject_us += t.elapsed().as_micros() as u64;
                metrics.injection += injected;
            }

            let t = Instant::now();
            exchange_all(exchange, topology, tiles, &mut stream);
            metrics.exchange_us += t.elapsed().as_micros() as u64;
        }

        if steps.run > 0 {
            let t = Instant::now();
            for sim in tiles.values_mut() {
                sim.derive(jump_flood, &mut stream);
            }
            metrics.derive_us = t.elapsed().as_micros() as u64;
        }
        metrics.dispatches = stream.dispatches();
        drop(stream);

        let t = Instant::now();
        for sim in tiles.values_mut() {
            // Only non-zero on backends that complete readbacks synchronously.
            let counts = sim.request_readbacks(&mut *backend);
            metrics.readbacks_completed += counts.completed;
            metrics.readbacks_failed += counts.failed;
        }
        readback_us += t.elapsed().as_micros() as u64;
        metrics.readback_us = readback_us;

        metrics.total_us = frame_start.elapsed().as_micros() as u64;
        log::trace!(
            "frame: {} step(s), {} dispatch(es), {}us",
            metrics.steps_run,
            metrics.dispatches,
            metrics.total_us
        );
        self.last_metrics = metrics.clone();
        Ok(metrics)
    }

    /// Metrics of the most recent frame.
    pub fn last_metrics(&self) -> &FrameMetrics {
        &self.last_metrics
    }

    /// The fixed-step clock.
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Steps run since creation.
    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    /// Solver variant in use.
    pub fn kind(&self) -> SimulationKind {
        self.kind
    }

    // ── Registries ──────────────────────────────────────────────

    /// Modifier registry.
    pub fn modifiers(&self) -> &ModifierRegistry {
        &self.modifiers
    }

    /// Modifier registry, mutably. Changes take effect on the next step.
    pub fn modifiers_mut(&mut self) -> &mut ModifierRegistry {
        &mut self.modifiers
    }

    /// Obstacle set.
    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    /// Obstacle set, mutably. Tiles redraw on the next frame after any
    /// change.
    pub fn obstacles_mut(&mut self) -> &mut ObstacleSet {
        &mut self.obstacles
    }

    /// The compute backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The compute backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Core kernel ids, for tests that count dispatches.
    pub fn kernels(&self) -> &Kernels {
        &self.kernels
    }

    /// Interned pass ids of the current solver kind.
    pub fn passes(&self) -> SolverPasses {
        self.passes
    }

    // ── World-space queries ─────────────────────────────────────

    /// First tile whose interior contains `p`.
    pub fn tile_at(&self, p: Vec2) -> Option<&Simulation> {
        self.tiles.values().find(|s| s.bounds().contains(p))
    }

    /// Decoded cell under `p` from whichever tile covers it.
    pub fn sample(&self, p: Vec2) -> Option<CellSample> {
        self.tile_at(p)?.sample(p)
    }

    /// World-space surface height at `p`.
    pub fn height_at(&self, p: Vec2) -> Option<f32> {
        self.tile_at(p)?.height_at(p)
    }

    /// Nearest wet position to `p` within the covering tile.
    pub fn nearest_fluid(&self, p: Vec2) -> Option<Vec2> {
        self.tile_at(p)?.nearest_fluid(p)
    }

    // ── Shutdown ────────────────────────────────────────────────

    /// Drain every readback, release every tile, and return the backend.
    pub fn teardown(mut self) -> B {
        self.backend.flush();
        for sim in self.tiles.values_mut() {
            sim.receive_readbacks();
            if sim.readback_pending() {
                log::warn!("{} still had readbacks pending at teardown", sim.id());
            }
            sim.release(&mut self.backend);
        }
        log::info!("fluid world torn down ({} tile(s))", self.tiles.len());
        self.tiles.clear();
        self.backend
    }
}

fn exchange_all(
    exchange: &mut BoundaryExchange,
    topology: &Topology,
    tiles: &mut IndexMap<TileId, Simulation>,
    stream: &mut CommandStream<'_>,
) {
    let mut grids: Vec<(TileId, &mut SimulationGrid)> =
        tiles.iter_mut().map(|(id, s)| (*id, s.grid_mut())).collect();
    exchange.exchange(topology, &mut grids, stream);
}

impl<B: ComputeBackend> std::fmt::Debug for FluidWorld<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluidWorld")
            .field("backend", &self.backend.name())
            .field("solver", &self.solver.name())
            .field("kind", &self.kind)
            .field("tiles", &self.tiles.len())
            .field("step", &self.step_id)
            .finish_non_exhaustive()
    }
}
