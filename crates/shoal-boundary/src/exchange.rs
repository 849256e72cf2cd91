//! Two-pass ghost-ring exchange.

use std::collections::HashMap;

use shoal_compute::{workgroups, CommandStream};
use shoal_core::TileId;
use shoal_grid::{FieldBuffer, GridConfig, SimulationGrid};

use crate::side::BoundarySide;
use crate::topology::Topology;

/// Which field an exchange refreshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeField {
    /// Per-layer depth.
    Height,
    /// Velocity (x, z).
    Velocity,
}

impl ExchangeField {
    /// Both fields, in exchange order.
    pub const ALL: [Self; 2] = [Self::Height, Self::Velocity];

    fn buffer(self, grid: &SimulationGrid) -> &FieldBuffer {
        match self {
            Self::Height => grid.height.active(),
            Self::Velocity => grid.velocity.active(),
        }
    }

    fn buffer_mut(self, grid: &mut SimulationGrid) -> &mut FieldBuffer {
        match self {
            Self::Height => grid.height.active_mut(),
            Self::Velocity => grid.velocity.active_mut(),
        }
    }
}

/// One side's interior strip, laid out `[depth][along][channel]`.
///
/// Depth 0 is the interior row or column touching the edge; along runs
/// in increasing grid x (Top/Bottom) or grid y (Left/Right).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Strip {
    depth: u32,
    along: u32,
    channels: u32,
    data: Vec<f32>,
}

impl Strip {
    fn new(depth: u32, along: u32, channels: u32) -> Self {
        Self {
            depth,
            along,
            channels,
            data: vec![0.0; depth as usize * along as usize * channels as usize],
        }
    }

    fn index(&self, d: u32, a: u32, ch: u32) -> usize {
        ((d * self.along + a) * self.channels + ch) as usize
    }

    /// Value at `(depth, along, channel)`.
    pub fn get(&self, d: u32, a: u32, ch: u32) -> f32 {
        self.data[self.index(d, a, ch)]
    }

    /// Strip depth (the ghost margin it was stored with).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Cells along the edge.
    pub fn along(&self) -> u32 {
        self.along
    }

    /// Values per cell.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Sample with the along axis resampled to `len` cells and the depth
    /// clamped to what was stored. Missing channels read as zero.
    fn resampled(&self, d: u32, a: u32, len: u32, ch: u32) -> f32 {
        if self.depth == 0 || self.along == 0 || ch >= self.channels {
            return 0.0;
        }
        let src_a = if len == self.along {
            a
        } else {
            let t = (a as f32 + 0.5) / len as f32;
            ((t * self.along as f32) as u32).min(self.along - 1)
        };
        self.get(d.min(self.depth - 1), src_a, ch)
    }
}

/// Cells along `side`.
fn along_len(config: &GridConfig, side: BoundarySide) -> u32 {
    if side.is_horizontal() {
        config.resolution[0]
    } else {
        config.resolution[1]
    }
}

/// Padded cell of the interior strip at `(depth, along)`.
fn interior_cell(config: &GridConfig, side: BoundarySide, d: u32, a: u32) -> (u32, u32) {
    let g = config.ghost_margin;
    let [rw, rh] = config.resolution;
    match side {
        BoundarySide::Left => (g + d, g + a),
        BoundarySide::Right => (g + rw - 1 - d, g + a),
        BoundarySide::Bottom => (g + a, g + d),
        BoundarySide::Top => (g + a, g + rh - 1 - d),
    }
}

/// Padded cell of the ghost ring at `(depth, along)`; depth 0 is the
/// ghost cell touching the interior.
fn ghost_cell(config: &GridConfig, side: BoundarySide, d: u32, a: u32) -> (u32, u32) {
    let g = config.ghost_margin;
    let [rw, rh] = config.resolution;
    match side {
        BoundarySide::Left => (g - 1 - d, g + a),
        BoundarySide::Right => (g + rw + d, g + a),
        BoundarySide::Bottom => (g + a, g - 1 - d),
        BoundarySide::Top => (g + a, g + rh + d),
    }
}

/// Side-indexed scratch and the exchange passes over it.
#[derive(Debug, Default)]
pub struct BoundaryExchange {
    open_borders: bool,
    scratch: HashMap<(TileId, BoundarySide), Strip>,
}

impl BoundaryExchange {
    /// An exchange with closed (reflective) or open (draining) borders.
    pub fn new(open_borders: bool) -> Self {
        Self {
            open_borders,
            scratch: HashMap::new(),
        }
    }

    /// Whether unlinked sides drain instead of reflecting.
    pub fn open_borders(&self) -> bool {
        self.open_borders
    }

    /// Switch between open and closed borders.
    pub fn set_open_borders(&mut self, open: bool) {
        self.open_borders = open;
    }

    /// The strip stored for `tile`'s `side` by the last store pass.
    pub fn strip(&self, tile: TileId, side: BoundarySide) -> Option<&Strip> {
        self.scratch.get(&(tile, side))
    }

    /// Drop scratch for a removed tile.
    pub fn forget(&mut self, tile: TileId) {
        self.scratch.retain(|(t, _), _| *t != tile);
    }

    /// Store then apply every field for every tile.
    pub fn exchange(
        &mut self,
        topology: &Topology,
        tiles: &mut [(TileId, &mut SimulationGrid)],
        stream: &mut CommandStream<'_>,
    ) {
        for field in ExchangeField::ALL {
            self.store(field, tiles, stream);
            self.apply(field, topology, tiles, stream);
        }
    }

    /// Pass 1: copy each tile's interior strips into scratch.
    pub fn store(
        &mut self,
        field: ExchangeField,
        tiles: &[(TileId, &mut SimulationGrid)],
        stream: &mut CommandStream<'_>,
    ) {
        let kernel = stream.kernels().store_strip;
        for (id, grid) in tiles {
            let config = grid.config();
            let src = field.buffer(grid);
            let g = config.ghost_margin;
            let channels = src.channels();
            for side in BoundarySide::ALL {
                let along = along_len(config, side);
                let strip = self
                    .scratch
                    .entry((*id, side))
                    .or_insert_with(|| Strip::new(g, along, channels));
                if (strip.depth, strip.along, strip.channels) != (g, along, channels) {
                    *strip = Strip::new(g, along, channels);
                }
                stream.dispatch(kernel, workgroups(along, g), || {
                    for d in 0..g {
                        for a in 0..along {
                            let (x, y) = interior_cell(config, side, d, a);
                            for ch in 0..channels {
                                let i = strip.index(d, a, ch);
                                strip.data[i] = src.get(x, y, ch);
                            }
                        }
                    }
                });
            }
        }
    }

    /// Pass 2: write each tile's ghost ring from its neighbours' strips,
    /// its own strips, or zeros, then fill the corners.
    pub fn apply(
        &mut self,
        field: ExchangeField,
        topology: &Topology,
        tiles: &mut [(TileId, &mut SimulationGrid)],
        stream: &mut CommandStream<'_>,
    ) {
        let kernel = stream.kernels().apply_strip;
        let open = self.open_borders;
        for (id, grid) in tiles.iter_mut() {
            let config = grid.config().clone();
            let dst = field.buffer_mut(grid);
            let g = config.ghost_margin;
            let channels = dst.channels();
            for side in BoundarySide::ALL {
                let along = along_len(&config, side);
                let source = match topology.neighbor(*id, side) {
                    Some(n) => self.scratch.get(&(n, side.opposite())),
                    None if open => None,
                    None => self.scratch.get(&(*id, side)),
                };
                if source.is_none() && topology.neighbor(*id, side).is_some() {
                    log::debug!("{id} {side} neighbour has no stored strip; clearing ghosts");
                }
                stream.dispatch(kernel, workgroups(along, g), || {
                    for d in 0..g {
                        for a in 0..along {
                            let (x, y) = ghost_cell(&config, side, d, a);
                            for ch in 0..channels {
                                let v = source.map_or(0.0, |s| s.resampled(d, a, along, ch));
                                dst.set(x, y, ch, v);
                            }
                        }
                    }
                });
            }
            fill_corners(&config, dst);
        }
    }
}

/// Copy the nearest edge ghost cell (same row, x clamped into the
/// interior) into each corner ghost cell.
fn fill_corners(config: &GridConfig, buf: &mut FieldBuffer) {
    let g = config.ghost_margin;
    let [rw, rh] = config.resolution;
    let [w, h] = config.padded();
    let channels = buf.channels();
    for y in (0..g).chain(g + rh..h) {
        for x in (0..g).chain(g + rw..w) {
            let sx = x.clamp(g, g + rw - 1);
            for ch in 0..channels {
                let v = buf.get(sx, y, ch);
                buf.set(x, y, ch, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_compute::{KernelTable, Kernels, SoftwareBackend};

    fn tile(res: u32, ghost: u32) -> SimulationGrid {
        let mut backend = SoftwareBackend::new();
        let mut cfg = GridConfig::new(res, res as f32);
        cfg.ghost_margin = ghost;
        SimulationGrid::init(&cfg, &mut backend).unwrap()
    }

    fn fill_ramp(grid: &mut SimulationGrid) {
        let [w, h] = grid.padded();
        for y in 0..h {
            for x in 0..w {
                grid.height.active_mut().set(x, y, 0, (y * 100 + x) as f32);
            }
        }
    }

    fn run(ex: &mut BoundaryExchange, topo: &Topology, tiles: &mut [(TileId, &mut SimulationGrid)]) {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut stream = CommandStream::new(&mut backend, &kernels);
        ex.exchange(topo, tiles, &mut stream);
    }

    #[test]
    fn closed_border_mirrors_own_strip() {
        let mut a = tile(4, 2);
        fill_ramp(&mut a);
        let mut topo = Topology::new();
        topo.insert(TileId(0), [0, 0]).unwrap();
        let mut ex = BoundaryExchange::new(false);
        run(&mut ex, &topo, &mut [(TileId(0), &mut a)]);
        let h = a.height.active();
        // Right edge: interior x = 5 (depth 0), 4 (depth 1); ghosts x = 6, 7.
        for y in 2..6 {
            assert_eq!(h.get(6, y, 0), h.get(5, y, 0));
            assert_eq!(h.get(7, y, 0), h.get(4, y, 0));
            assert_eq!(h.get(1, y, 0), h.get(2, y, 0));
            assert_eq!(h.get(0, y, 0), h.get(3, y, 0));
        }
        // Top ghosts row 6 mirrors row 5.
        assert_eq!(h.get(3, 6, 0), h.get(3, 5, 0));
    }

    #[test]
    fn open_border_clears_ghosts() {
        let mut a = tile(4, 2);
        a.height.active_mut().fill(1.0);
        let mut topo = Topology::new();
        topo.insert(TileId(0), [0, 0]).unwrap();
        let mut ex = BoundaryExchange::new(true);
        run(&mut ex, &topo, &mut [(TileId(0), &mut a)]);
        let h = a.height.active();
        assert_eq!(h.get(6, 3, 0), 0.0);
        assert_eq!(h.get(0, 0, 0), 0.0);
        assert_eq!(h.get(3, 3, 0), 1.0);
    }

    #[test]
    fn corners_copy_nearest_edge_ghost() {
        let mut a = tile(4, 2);
        fill_ramp(&mut a);
        let mut topo = Topology::new();
        topo.insert(TileId(0), [0, 0]).unwrap();
        let mut ex = BoundaryExchange::new(false);
        run(&mut ex, &topo, &mut [(TileId(0), &mut a)]);
        let h = a.height.active();
        assert_eq!(h.get(0, 0, 0), h.get(2, 0, 0));
        assert_eq!(h.get(7, 7, 0), h.get(5, 7, 0));
    }

    #[test]
    fn linked_tiles_see_each_other() {
        let mut a = tile(4, 2);
        let mut b = tile(4, 2);
        a.height.active_mut().fill(1.0);
        b.height.active_mut().fill(2.0);
        let mut topo = Topology::new();
        topo.insert(TileId(0), [0, 0]).unwrap();
        topo.attach(TileId(0), BoundarySide::Right, TileId(1)).unwrap();
        let mut ex = BoundaryExchange::new(false);
        run(&mut ex, &topo, &mut [(TileId(0), &mut a), (TileId(1), &mut b)]);
        for y in 2..6 {
            assert_eq!(a.height.active().get(6, y, 0), 2.0);
            assert_eq!(a.height.active().get(7, y, 0), 2.0);
            assert_eq!(b.height.active().get(1, y, 0), 1.0);
            assert_eq!(b.height.active().get(0, y, 0), 1.0);
            // Unlinked sides stay closed.
            assert_eq!(a.height.active().get(1, y, 0), 1.0);
        }
    }

    #[test]
    fn mismatched_resolution_is_resampled() {
        let mut a = tile(4, 1);
        let mut b = tile(8, 1);
        let [w, h] = b.padded();
        for y in 0..h {
            for x in 0..w {
                b.height.active_mut().set(x, y, 0, y as f32);
            }
        }
        let mut topo = Topology::new();
        topo.insert(TileId(0), [0, 0]).unwrap();
        topo.attach(TileId(0), BoundarySide::Right, TileId(1)).unwrap();
        let mut ex = BoundaryExchange::new(false);
        run(&mut ex, &topo, &mut [(TileId(0), &mut a), (TileId(1), &mut b)]);
        // a's along index 0..4 maps to b's along 1, 3, 5, 7 -> rows 2, 4, 6, 8.
        let got: Vec<f32> = (1..5).map(|y| a.height.active().get(5, y, 0)).collect();
        assert_eq!(got, vec![2.0, 4.0, 6.0, 8.0]);
    }
}
