//! The solver strategy seam.
//!
//! Integrating the fluid equations is not this crate's job. A
//! [`Solver`] reads the active height and velocity buffers and writes
//! the next ones; the simulation swaps them afterwards. [`IdleSolver`]
//! is the reference strategy: it moves no fluid, only applying
//! evaporation and velocity damping.

use std::error::Error;
use std::fmt;

use glam::Vec2;
use shoal_compute::{workgroups, CommandStream};
use shoal_core::{FluidLayer, StepId};
use shoal_grid::SimulationGrid;

use crate::config::LayerPhysics;
use crate::kind::{KindParams, SimulationKind, SolverPasses};

/// A solver step that could not run. The tile keeps its previous state
/// for that step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverError {
    /// Description of the failure.
    pub reason: String,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "solver failed: {}", self.reason)
    }
}

impl Error for SolverError {}

/// Inputs of one solver step.
pub struct SolveContext<'s, 'a> {
    pub(crate) stream: &'s mut CommandStream<'a>,
    pub(crate) dt: f32,
    pub(crate) step: StepId,
    pub(crate) kind: SimulationKind,
    pub(crate) passes: SolverPasses,
    pub(crate) physics: [LayerPhysics; 2],
    pub(crate) cell_size: Vec2,
}

impl<'s, 'a> SolveContext<'s, 'a> {
    /// Build a context directly, for driving a solver outside a world.
    pub fn new(
        stream: &'s mut CommandStream<'a>,
        dt: f32,
        kind: SimulationKind,
        passes: SolverPasses,
        physics: [LayerPhysics; 2],
        cell_size: Vec2,
    ) -> Self {
        Self {
            stream,
            dt,
            step: StepId::default(),
            kind,
            passes,
            physics,
            cell_size,
        }
    }

    /// The tile's command stream.
    pub fn stream(&mut self) -> &mut CommandStream<'a> {
        self.stream
    }

    /// Fixed step length in seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// World step counter.
    pub fn step(&self) -> StepId {
        self.step
    }

    /// Solver variant.
    pub fn kind(&self) -> SimulationKind {
        self.kind
    }

    /// Constants of the variant.
    pub fn params(&self) -> &'static KindParams {
        self.kind.params()
    }

    /// Interned pass ids of the variant.
    pub fn passes(&self) -> SolverPasses {
        self.passes
    }

    /// Physics of `layer`.
    pub fn physics(&self, layer: FluidLayer) -> LayerPhysics {
        self.physics[layer.index()]
    }

    /// Cell size as the solver should see it (world cell size times the
    /// configured scale).
    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }
}

/// Integrates one tile for one fixed step.
///
/// # Contract
///
/// - Read `grid.height.active()` and `grid.velocity.active()`.
/// - Write every cell of `grid.height.next_mut()` and
///   `grid.velocity.next_mut()`, ghost cells included.
/// - Issue work through `ctx.stream()` only.
///
/// The caller swaps after a successful step and leaves the buffers alone
/// after an error.
pub trait Solver: Send {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Run one step.
    fn solve(
        &mut self,
        grid: &mut SimulationGrid,
        ctx: &mut SolveContext<'_, '_>,
    ) -> Result<(), SolverError>;
}

/// Moves no fluid. Depth evaporates at each layer's rate and velocity
/// decays by the first layer's damping.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleSolver;

impl Solver for IdleSolver {
    fn name(&self) -> &str {
        "idle"
    }

    fn solve(
        &mut self,
        grid: &mut SimulationGrid,
        ctx: &mut SolveContext<'_, '_>,
    ) -> Result<(), SolverError> {
        let dt = ctx.dt();
        let [w, h] = grid.padded();
        let layers = grid.layers() as usize;
        let evaporation: Vec<f32> = (0..layers)
            .map(|l| ctx.physics(FluidLayer::from_index(l)).evaporation * dt)
            .collect();
        let keep = (1.0 - ctx.physics(FluidLayer::Primary).wave_damping * dt).clamp(0.0, 1.0);
        let kernel = ctx.passes().integrate;
        let (height, next_height) = grid.height.split();
        let (velocity, next_velocity) = grid.velocity.split();
        ctx.stream().dispatch(kernel, workgroups(w, h), || {
            for (dst, src) in next_height
                .data_mut()
                .chunks_exact_mut(layers)
                .zip(height.data().chunks_exact(layers))
            {
                for ((d, s), e) in dst.iter_mut().zip(src).zip(&evaporation) {
                    *d = (s - e).max(0.0);
                }
            }
            for (d, s) in next_velocity.data_mut().iter_mut().zip(velocity.data()) {
                *d = s * keep;
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_compute::{KernelTable, Kernels, SoftwareBackend};
    use shoal_grid::GridConfig;

    fn physics(evaporation: f32, damping: f32) -> LayerPhysics {
        LayerPhysics {
            acceleration: 9.81,
            wave_damping: damping,
            evaporation,
        }
    }

    #[test]
    fn idle_solver_evaporates_and_damps() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let passes = SimulationKind::ShallowWater.resolve_passes(&mut table);
        let mut grid = SimulationGrid::init(&GridConfig::new(4, 4.0), &mut backend).unwrap();
        grid.height.active_mut().set(3, 3, 0, 1.0);
        grid.height.active_mut().set(4, 4, 0, 0.1);
        grid.velocity.active_mut().set(3, 3, 0, 2.0);

        let mut stream = CommandStream::new(&mut backend, &kernels);
        let mut ctx = SolveContext::new(
            &mut stream,
            0.5,
            SimulationKind::ShallowWater,
            passes,
            [physics(0.4, 0.5), physics(0.0, 0.0)],
            Vec2::ONE,
        );
        IdleSolver.solve(&mut grid, &mut ctx).unwrap();
        drop(ctx);
        drop(stream);
        grid.swap();

        assert_eq!(grid.height.active().get(3, 3, 0), 0.8);
        assert_eq!(grid.height.active().get(4, 4, 0), 0.0);
        assert_eq!(grid.velocity.active().get(3, 3, 0), 1.5);
        assert_eq!(backend.dispatch_count(passes.integrate), 1);
    }
}
