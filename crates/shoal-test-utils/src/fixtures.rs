//! Reusable solver fixtures.
//!
//! Three standard solvers for engine testing:
//!
//! - [`IdentitySolver`]: copies active height and velocity into next.
//! - [`ConstSolver`]: writes a constant depth into every cell of one layer.
//! - [`FailingSolver`]: fails deterministically after N calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shoal_compute::workgroups;
use shoal_core::FluidLayer;
use shoal_engine::{SolveContext, Solver, SolverError};
use shoal_grid::SimulationGrid;

fn copy_through(grid: &mut SimulationGrid, ctx: &mut SolveContext<'_, '_>) {
    let [w, h] = grid.padded();
    let kernel = ctx.passes().integrate;
    let (height, next_height) = grid.height.split();
    let (velocity, next_velocity) = grid.velocity.split();
    ctx.stream().dispatch(kernel, workgroups(w, h), || {
        next_height.data_mut().copy_from_slice(height.data());
        next_velocity.data_mut().copy_from_slice(velocity.data());
    });
}

/// Moves nothing: the next state equals the current one.
///
/// Useful for isolating injection and exchange from any solver effect.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentitySolver;

impl Solver for IdentitySolver {
    fn name(&self) -> &str {
        "identity"
    }

    fn solve(
        &mut self,
        grid: &mut SimulationGrid,
        ctx: &mut SolveContext<'_, '_>,
    ) -> Result<(), SolverError> {
        copy_through(grid, ctx);
        Ok(())
    }
}

/// Writes `value` as the depth of `layer` in every cell, ghosts
/// included. Other layers and velocity are copied through.
#[derive(Clone, Copy, Debug)]
pub struct ConstSolver {
    pub layer: FluidLayer,
    pub value: f32,
}

impl ConstSolver {
    pub fn new(value: f32) -> Self {
        Self {
            layer: FluidLayer::Primary,
            value,
        }
    }
}

impl Solver for ConstSolver {
    fn name(&self) -> &str {
        "const"
    }

    fn solve(
        &mut self,
        grid: &mut SimulationGrid,
        ctx: &mut SolveContext<'_, '_>,
    ) -> Result<(), SolverError> {
        let li = self.layer.index() as u32;
        if li >= grid.layers() {
            return Err(SolverError {
                reason: format!("tile has no {:?} layer", self.layer),
            });
        }
        copy_through(grid, ctx);
        let [w, h] = grid.padded();
        let next = grid.height.next_mut();
        let value = self.value;
        let kernel = ctx.passes().integrate;
        ctx.stream().dispatch(kernel, workgroups(w, h), || {
            for y in 0..h {
                for x in 0..w {
                    next.set(x, y, li, value);
                }
            }
        });
        Ok(())
    }
}

/// Succeeds `succeed_count` times (copying state through), then fails
/// every call.
///
/// The call counter is shared, so a test can keep a handle after boxing
/// the solver into a world.
#[derive(Debug)]
pub struct FailingSolver {
    pub succeed_count: usize,
    calls: Arc<AtomicUsize>,
}

impl FailingSolver {
    /// Create a solver that succeeds `succeed_count` times then fails.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared handle to the call counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Solver for FailingSolver {
    fn name(&self) -> &str {
        "failing"
    }

    fn solve(
        &mut self,
        grid: &mut SimulationGrid,
        ctx: &mut SolveContext<'_, '_>,
    ) -> Result<(), SolverError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(SolverError {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        copy_through(grid, ctx);
        Ok(())
    }
}
