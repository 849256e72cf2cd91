//! World-level error type.

use std::error::Error;
use std::fmt;

use shoal_boundary::TopologyError;
use shoal_core::TileId;
use shoal_grid::{GridError, PersistError};

/// Errors surfaced by [`FluidWorld`](crate::FluidWorld).
///
/// Only allocation failures, invalid tile placement and persistence I/O
/// reach the caller. Everything else degrades locally and is logged.
#[derive(Debug)]
pub enum WorldError {
    /// A tile's buffers could not be allocated or restored.
    Grid(GridError),
    /// The tile could not be placed in the lattice.
    Topology(TopologyError),
    /// No tile with this ID exists.
    UnknownTile(TileId),
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::UnknownTile(id) => write!(f, "unknown tile {id}"),
        }
    }
}

impl Error for WorldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            Self::Topology(e) => Some(e),
            Self::UnknownTile(_) => None,
        }
    }
}

impl From<GridError> for WorldError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<PersistError> for WorldError {
    fn from(e: PersistError) -> Self {
        Self::Grid(GridError::Persist(e))
    }
}

impl From<TopologyError> for WorldError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}
