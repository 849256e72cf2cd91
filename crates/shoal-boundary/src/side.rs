//! The four sides of a tile.

use std::fmt;

/// One side of a tile on the x/z plane.
///
/// Left/Right run along world X, Bottom/Top along world Z (grid rows).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundarySide {
    /// Towards -X.
    Left,
    /// Towards +X.
    Right,
    /// Towards +Z.
    Top,
    /// Towards -Z.
    Bottom,
}

impl BoundarySide {
    /// All sides, in link-array order.
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];

    /// Index into a `[_; 4]` link array.
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Top => 2,
            Self::Bottom => 3,
        }
    }

    /// The side facing this one across a shared edge.
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }

    /// Lattice step towards this side.
    pub fn offset(self) -> [i32; 2] {
        match self {
            Self::Left => [-1, 0],
            Self::Right => [1, 0],
            Self::Top => [0, 1],
            Self::Bottom => [0, -1],
        }
    }

    /// Whether the strip for this side runs along grid rows (Top/Bottom)
    /// rather than columns.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

impl fmt::Display for BoundarySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        };
        f.write_str(s)
    }
}
