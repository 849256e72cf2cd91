//! Symmetric tile adjacency.
//!
//! Every link is stored twice, once on each tile, and the two halves are
//! only ever written together: `link(a, Right, b)` also sets `b.Left = a`,
//! and `unlink` clears both. Topology is mutated on the control thread
//! between steps, never concurrently with an exchange.

use std::collections::HashMap;

use indexmap::IndexMap;
use shoal_core::TileId;

use crate::error::TopologyError;
use crate::side::BoundarySide;

/// Integer position of a tile in the tiling lattice.
pub type LatticeCoord = [i32; 2];

#[derive(Clone, Debug)]
struct Node {
    coord: LatticeCoord,
    links: [Option<TileId>; 4],
}

/// Registered tiles, their lattice coordinates and their links.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    nodes: IndexMap<TileId, Node>,
    by_coord: HashMap<LatticeCoord, TileId>,
}

impl Topology {
    /// An empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tile` at `coord` with no links.
    pub fn insert(&mut self, tile: TileId, coord: LatticeCoord) -> Result<(), TopologyError> {
        if self.nodes.contains_key(&tile) {
            return Err(TopologyError::DuplicateTile(tile));
        }
        if let Some(&by) = self.by_coord.get(&coord) {
            return Err(TopologyError::CoordinateOccupied { coord, by });
        }
        self.nodes.insert(
            tile,
            Node {
                coord,
                links: [None; 4],
            },
        );
        self.by_coord.insert(coord, tile);
        Ok(())
    }

    /// Deregister `tile`, clearing every link that points at it.
    /// Returns its coordinate if it was registered.
    pub fn remove(&mut self, tile: TileId) -> Option<LatticeCoord> {
        let node = self.nodes.get(&tile)?.clone();
        for side in BoundarySide::ALL {
            if let Some(other) = node.links[side.index()] {
                if let Some(o) = self.nodes.get_mut(&other) {
                    o.links[side.opposite().index()] = None;
                }
            }
        }
        self.nodes.shift_remove(&tile);
        self.by_coord.remove(&node.coord);
        Some(node.coord)
    }

    /// Link `a`'s `side` to `b`, and `b`'s opposite side to `a`.
    ///
    /// Re-linking an existing pair is a no-op. Fails without changing
    /// anything if either side is already linked elsewhere.
    pub fn link(&mut self, a: TileId, side: BoundarySide, b: TileId) -> Result<(), TopologyError> {
        if a == b {
            return Err(TopologyError::SelfLink(a));
        }
        let na = self.nodes.get(&a).ok_or(TopologyError::UnknownTile(a))?;
        let nb = self.nodes.get(&b).ok_or(TopologyError::UnknownTile(b))?;
        match na.links[side.index()] {
            Some(existing) if existing != b => {
                return Err(TopologyError::SideOccupied {
                    tile: a,
                    side,
                    existing,
                })
            }
            _ => {}
        }
        match nb.links[side.opposite().index()] {
            Some(existing) if existing != a => {
                return Err(TopologyError::SideOccupied {
                    tile: b,
                    side: side.opposite(),
                    existing,
                })
            }
            _ => {}
        }
        self.set_half(a, side, Some(b));
        self.set_half(b, side.opposite(), Some(a));
        Ok(())
    }

    /// Clear `a`'s `side` link and its mirror. Returns the former
    /// neighbour.
    pub fn unlink(&mut self, a: TileId, side: BoundarySide) -> Option<TileId> {
        let b = self.neighbor(a, side)?;
        self.set_half(a, side, None);
        self.set_half(b, side.opposite(), None);
        Some(b)
    }

    fn set_half(&mut self, tile: TileId, side: BoundarySide, value: Option<TileId>) {
        if let Some(n) = self.nodes.get_mut(&tile) {
            n.links[side.index()] = value;
        }
    }

    /// The tile linked on `side`, if any.
    pub fn neighbor(&self, tile: TileId, side: BoundarySide) -> Option<TileId> {
        self.nodes.get(&tile)?.links[side.index()]
    }

    /// All four links, indexed by [`BoundarySide::index`].
    pub fn links(&self, tile: TileId) -> Option<[Option<TileId>; 4]> {
        self.nodes.get(&tile).map(|n| n.links)
    }

    /// Lattice coordinate of a tile.
    pub fn coord(&self, tile: TileId) -> Option<LatticeCoord> {
        self.nodes.get(&tile).map(|n| n.coord)
    }

    /// Tile at a lattice coordinate.
    pub fn tile_at(&self, coord: LatticeCoord) -> Option<TileId> {
        self.by_coord.get(&coord).copied()
    }

    /// Whether `tile` is registered.
    pub fn contains(&self, tile: TileId) -> bool {
        self.nodes.contains_key(&tile)
    }

    /// Registered tiles in insertion order.
    pub fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of registered tiles.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no tiles are registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether every link has its mirror. Always true unless the
    /// topology was corrupted; used by tests and debug assertions.
    pub fn is_symmetric(&self) -> bool {
        self.nodes.iter().all(|(&id, node)| {
            BoundarySide::ALL.iter().all(|&side| match node.links[side.index()] {
                Some(other) => self.neighbor(other, side.opposite()) == Some(id),
                None => true,
            })
        })
    }
}
