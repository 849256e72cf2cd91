//! Topology error types.

use std::error::Error;
use std::fmt;

use shoal_core::TileId;

use crate::side::BoundarySide;
use crate::topology::LatticeCoord;

/// Errors from topology mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// The tile is not registered.
    UnknownTile(TileId),
    /// The side already links to a different tile.
    SideOccupied {
        /// Tile whose side is taken.
        tile: TileId,
        /// The side.
        side: BoundarySide,
        /// Tile currently linked there.
        existing: TileId,
    },
    /// A tile cannot neighbour itself.
    SelfLink(TileId),
    /// Another tile already sits at the lattice coordinate.
    CoordinateOccupied {
        /// The coordinate.
        coord: LatticeCoord,
        /// Tile occupying it.
        by: TileId,
    },
    /// The tile is already registered.
    DuplicateTile(TileId),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTile(t) => write!(f, "unknown tile {t}"),
            Self::SideOccupied {
                tile,
                side,
                existing,
            } => write!(f, "{tile} {side} side already linked to {existing}"),
            Self::SelfLink(t) => write!(f, "{t} cannot link to itself"),
            Self::CoordinateOccupied { coord, by } => {
                write!(f, "lattice coordinate {coord:?} already holds {by}")
            }
            Self::DuplicateTile(t) => write!(f, "{t} is already registered"),
        }
    }
}

impl Error for TopologyError {}
