//! Fixed-timestep accumulator.

/// Steps decided by one [`SimulationClock::advance`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSteps {
    /// Fixed steps to run this frame.
    pub run: u32,
    /// Whole steps that were due but discarded by the per-frame cap.
    pub dropped: u32,
}

/// Converts variable frame time into a bounded number of fixed steps.
///
/// Frame time accumulates; each frame runs as many whole steps as fit,
/// up to `max_steps_per_frame`. Whole steps beyond the cap are dropped
/// and their time removed from the accumulator, so a sustained slowdown
/// runs the simulation in slow motion instead of spiralling. The
/// fractional remainder always carries over.
///
/// For any sequence of frames,
/// `(steps_run + steps_dropped) * step_duration + accumulated` equals the
/// total time fed in.
#[derive(Clone, Debug)]
pub struct SimulationClock {
    step_duration: f64,
    max_steps_per_frame: u32,
    accumulated: f64,
    steps_run: u64,
    steps_dropped: u64,
}

impl SimulationClock {
    /// A clock with the given step length (seconds) and per-frame cap.
    /// The cap is at least 1.
    pub fn new(step_duration: f32, max_steps_per_frame: u32) -> Self {
        Self {
            step_duration: f64::from(step_duration),
            max_steps_per_frame: max_steps_per_frame.max(1),
            accumulated: 0.0,
            steps_run: 0,
            steps_dropped: 0,
        }
    }

    /// Feed `dt` seconds of frame time. Negative and non-finite values
    /// count as zero.
    pub fn advance(&mut self, dt: f32) -> FrameSteps {
        let dt = if dt.is_finite() { f64::from(dt.max(0.0)) } else { 0.0 };
        self.accumulated += dt;
        if self.accumulated < self.step_duration {
            return FrameSteps::default();
        }
        let due = (self.accumulated / self.step_duration).floor();
        let due = if due > f64::from(u32::MAX) { u32::MAX } else { due as u32 };
        let run = due.min(self.max_steps_per_frame);
        let dropped = due - run;
        self.accumulated -= f64::from(due) * self.step_duration;
        self.steps_run += u64::from(run);
        self.steps_dropped += u64::from(dropped);
        if dropped > 0 {
            log::debug!("clock dropped {dropped} step(s); running {run}");
        }
        FrameSteps { run, dropped }
    }

    /// Fixed step length in seconds.
    pub fn step_duration(&self) -> f32 {
        self.step_duration as f32
    }

    /// Per-frame step cap.
    pub fn max_steps_per_frame(&self) -> u32 {
        self.max_steps_per_frame
    }

    /// Leftover time not yet consumed by a step.
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Fraction of a step currently accumulated, for interpolation.
    pub fn alpha(&self) -> f32 {
        (self.accumulated / self.step_duration) as f32
    }

    /// Total steps run.
    pub fn steps_run(&self) -> u64 {
        self.steps_run
    }

    /// Total steps dropped by the cap.
    pub fn steps_dropped(&self) -> u64 {
        self.steps_dropped
    }

    /// Change step length and cap, keeping the accumulator.
    pub fn reconfigure(&mut self, step_duration: f32, max_steps_per_frame: u32) {
        self.step_duration = f64::from(step_duration);
        self.max_steps_per_frame = max_steps_per_frame.max(1);
    }

    /// Zero the accumulator and counters.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.steps_run = 0;
        self.steps_dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_frames_accumulate() {
        let mut c = SimulationClock::new(0.25, 3);
        assert_eq!(c.advance(0.125), FrameSteps::default());
        assert_eq!(c.advance(0.125), FrameSteps { run: 1, dropped: 0 });
        assert_eq!(c.accumulated(), 0.0);
    }

    #[test]
    fn leftover_is_kept_not_reset() {
        let mut c = SimulationClock::new(0.25, 3);
        assert_eq!(c.advance(0.625).run, 2);
        assert_eq!(c.accumulated(), 0.125);
        assert_eq!(c.alpha(), 0.5);
    }

    #[test]
    fn spikes_are_capped_and_dropped() {
        let mut c = SimulationClock::new(0.25, 3);
        let f = c.advance(1.375);
        assert_eq!(f, FrameSteps { run: 3, dropped: 2 });
        assert_eq!(c.accumulated(), 0.125);
        assert_eq!(c.steps_dropped(), 2);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let mut c = SimulationClock::new(0.25, 3);
        assert_eq!(c.advance(-1.0).run, 0);
        assert_eq!(c.advance(f32::NAN).run, 0);
        assert_eq!(c.advance(f32::INFINITY).run, 0);
        assert_eq!(c.accumulated(), 0.0);
    }

    proptest! {
        #[test]
        fn time_is_conserved(
            frames in proptest::collection::vec(0.0f32..0.5, 1..200),
            step in 0.004f32..0.1,
            cap in 1u32..6,
        ) {
            let mut c = SimulationClock::new(step, cap);
            let mut fed = 0.0f64;
            let mut run = 0u64;
            let mut dropped = 0u64;
            for dt in &frames {
                fed += f64::from(*dt);
                let f = c.advance(*dt);
                prop_assert!(f.run <= cap);
                run += u64::from(f.run);
                dropped += u64::from(f.dropped);
            }
            prop_assert_eq!(run, c.steps_run());
            prop_assert_eq!(dropped, c.steps_dropped());
            let accounted = (run + dropped) as f64 * f64::from(step) + c.accumulated();
            prop_assert!((accounted - fed).abs() < 1e-9 * frames.len() as f64 + 1e-12);
            prop_assert!(c.accumulated() >= -1e-12);
            prop_assert!(c.accumulated() < f64::from(step) + 1e-9);
        }
    }
}
