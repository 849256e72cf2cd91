//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one simulation tile within a world.
///
/// Tiles are created by the world and assigned sequential IDs. IDs are
/// never reused after a tile is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

impl From<u32> for TileId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a registered modifier (source, flow, or force).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModifierId(pub u64);

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modifier#{}", self.0)
    }
}

/// Identifies a registered obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObstacleId(pub u64);

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obstacle#{}", self.0)
    }
}

/// Monotonically increasing fixed-step counter.
///
/// Incremented once per fixed simulation step, independent of how many
/// steps the clock schedules per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl StepId {
    /// The step following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generation tag attached to asynchronous readback requests.
///
/// Bumped whenever the buffers a readback targets are reallocated.
/// Completions carrying an older generation are ignored rather than
/// copied into a mirror whose layout has changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadbackGeneration(pub u64);

impl ReadbackGeneration {
    /// The generation following this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ReadbackGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_increments() {
        assert_eq!(StepId(4).next(), StepId(5));
    }

    #[test]
    fn generation_wraps_instead_of_overflowing() {
        assert_eq!(ReadbackGeneration(u64::MAX).next(), ReadbackGeneration(0));
    }

    #[test]
    fn display_formats() {
        assert_eq!(TileId(3).to_string(), "tile#3");
        assert_eq!(ModifierId(9).to_string(), "modifier#9");
        assert_eq!(ReadbackGeneration(2).to_string(), "gen2");
    }
}
