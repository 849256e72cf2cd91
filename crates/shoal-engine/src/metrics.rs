//! Per-frame metrics.
//!
//! [`FrameMetrics`] is filled by every
//! [`FluidWorld::advance`](crate::FluidWorld::advance) call and can be
//! read back from the world until the next one.

use shoal_modifier::InjectStats;

/// Counters and timings for one frame.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameMetrics {
    /// Fixed steps run.
    pub steps_run: u32,
    /// Whole steps discarded by the per-frame cap.
    pub steps_dropped: u32,
    /// Kernel dispatches issued.
    pub dispatches: u32,
    /// Modifier application counts summed over steps and tiles.
    pub injection: InjectStats,
    /// Solver steps that failed and left their tile unchanged.
    pub solver_failures: u32,
    /// Readback completions copied into mirrors.
    pub readbacks_completed: u64,
    /// Readback completions that failed and will be retried.
    pub readbacks_failed: u64,
    /// Readback completions dropped as stale.
    pub readbacks_stale: u64,
    /// Wall-clock time for the whole frame.
    pub total_us: u64,
    /// Time in boundary exchange.
    pub exchange_us: u64,
    /// Time in modifier injection.
    pub inject_us: u64,
    /// Time in the solver.
    pub solve_us: u64,
    /// Time in composite, normal and distance passes.
    pub derive_us: u64,
    /// Time issuing and receiving readbacks.
    pub readback_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = FrameMetrics::default();
        assert_eq!(m.steps_run, 0);
        assert_eq!(m.dispatches, 0);
        assert_eq!(m.injection, InjectStats::default());
        assert_eq!(m.total_us, 0);
    }
}
