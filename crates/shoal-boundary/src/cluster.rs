//! Growing a cluster of tiles one neighbour at a time.

use std::collections::VecDeque;

use shoal_core::TileId;
use smallvec::SmallVec;

use crate::error::TopologyError;
use crate::side::BoundarySide;
use crate::topology::{LatticeCoord, Topology};

/// Links created by one attach: at most one per side.
pub type Links = SmallVec<[(BoundarySide, TileId); 4]>;

impl Topology {
    /// Register `tile` on `parent`'s `side` and link it to every tile
    /// already sitting next to it in the lattice, `parent` included.
    ///
    /// Returns the links made. Adding one tile therefore updates the
    /// whole local cluster: a tile dropped into a gap between existing
    /// tiles is joined to all of them at once.
    pub fn attach(
        &mut self,
        parent: TileId,
        side: BoundarySide,
        tile: TileId,
    ) -> Result<Links, TopologyError> {
        let pc = self.coord(parent).ok_or(TopologyError::UnknownTile(parent))?;
        let [dx, dy] = side.offset();
        self.insert(tile, [pc[0] + dx, pc[1] + dy])?;
        Ok(self.auto_link(tile))
    }

    /// Link `tile` to each registered tile one lattice step away.
    ///
    /// Sides already linked elsewhere are left as they are.
    pub fn auto_link(&mut self, tile: TileId) -> Links {
        let mut made = Links::new();
        let Some(coord) = self.coord(tile) else {
            return made;
        };
        for side in BoundarySide::ALL {
            let Some(other) = self.tile_at(step(coord, side)) else {
                continue;
            };
            if self.neighbor(tile, side) == Some(other) {
                continue;
            }
            match self.link(tile, side, other) {
                Ok(()) => made.push((side, other)),
                Err(e) => log::debug!("auto-link of {tile} skipped: {e}"),
            }
        }
        made
    }

    /// Tiles reachable from `start` through at most `depth` links, in
    /// breadth-first order, `start` first. Empty if `start` is unknown.
    pub fn gather(&self, start: TileId, depth: usize) -> SmallVec<[TileId; 8]> {
        let mut out = SmallVec::new();
        if !self.contains(start) {
            return out;
        }
        let mut queue = VecDeque::from([(start, 0usize)]);
        out.push(start);
        while let Some((tile, d)) = queue.pop_front() {
            if d == depth {
                continue;
            }
            for next in self.links(tile).into_iter().flatten().flatten() {
                if !out.contains(&next) {
                    out.push(next);
                    queue.push_back((next, d + 1));
                }
            }
        }
        out
    }
}

fn step(coord: LatticeCoord, side: BoundarySide) -> LatticeCoord {
    let [dx, dy] = side.offset();
    [coord[0] + dx, coord[1] + dy]
}
