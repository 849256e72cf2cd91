//! Jump-flood nearest-fluid field.
//!
//! Every texel of the distance field ends up holding the UV (in the
//! tile's interior bounds) of the nearest texel that contains fluid, or
//! `[NaN, NaN]` when the tile is dry. One seed pass marks wet texels
//! with their own UV; each following pass looks at the 3×3 neighbours at
//! a power-of-two stride and keeps the closest seed it sees, halving the
//! stride until it reaches 1.

use glam::Vec2;
use shoal_compute::{workgroups, CommandStream};
use shoal_core::WorldBounds;
use shoal_grid::{GridConfig, SeedField, SimulationGrid};

/// Total depth a cell needs to count as fluid.
pub const MIN_SEED_DEPTH: f32 = 1e-3;

/// Marker for "no fluid found".
pub const NO_SEED: [f32; 2] = [f32::NAN, f32::NAN];

/// Passes needed to cover a `width × height` field,
/// `ceil(log2(max(width, height)))`, capped at `max_iterations`.
pub fn iteration_count(max_iterations: u32, width: u32, height: u32) -> u32 {
    let dim = width.max(height).max(1);
    let needed = u32::BITS - (dim - 1).leading_zeros();
    needed.min(max_iterations)
}

/// World position of a decoded seed, or `None` for [`NO_SEED`].
pub fn seed_world(bounds: &WorldBounds, seed: [f32; 2]) -> Option<Vec2> {
    let uv = Vec2::from(seed);
    uv.is_finite().then(|| bounds.from_uv(uv))
}

/// Jump-flood pass settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpFlood {
    /// Upper bound on propagation passes.
    pub max_iterations: u32,
    /// Depth threshold for seeding.
    pub seed_depth: f32,
}

impl Default for JumpFlood {
    fn default() -> Self {
        Self {
            max_iterations: 12,
            seed_depth: MIN_SEED_DEPTH,
        }
    }
}

impl JumpFlood {
    /// Passes with the given iteration cap.
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }

    /// Rebuild `grid.distance` from the active height field. Returns the
    /// number of propagation passes run; zero when the grid has no
    /// distance field.
    pub fn run(&self, grid: &mut SimulationGrid, stream: &mut CommandStream<'_>) -> u32 {
        let config = grid.config().clone();
        let Some([dw, dh]) = config.distance_resolution() else {
            return 0;
        };
        let height = grid.height.active();
        let Some(distance) = grid.distance.as_mut() else {
            return 0;
        };

        let seed_depth = self.seed_depth;
        let kernels = *stream.kernels();
        let target = distance.next_mut();
        stream.dispatch(kernels.jump_flood_seed, workgroups(dw, dh), || {
            seed(&config, seed_depth, |x, y| height.cell(x, y).iter().sum(), target);
        });
        distance.swap();

        let passes = iteration_count(self.max_iterations, dw, dh);
        let scale = config.dimension;
        for k in (0..passes).rev() {
            let stride = 1i64 << k;
            let (read, write) = distance.split();
            stream.dispatch(kernels.jump_flood_step, workgroups(dw, dh), || {
                propagate(read, write, stride, scale);
            });
            distance.swap();
        }
        log::trace!("jump flood: {passes} pass(es) over {dw}x{dh}");
        passes
    }
}

fn texel_uv(x: u32, y: u32, w: u32, h: u32) -> Vec2 {
    Vec2::new((x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32)
}

/// Mark each distance texel whose block of interior cells holds fluid.
/// The last texel on each axis also covers any remainder cells.
fn seed(
    config: &GridConfig,
    seed_depth: f32,
    depth: impl Fn(u32, u32) -> f32,
    target: &mut SeedField,
) {
    let d = config.distance_downsample.unwrap_or(1);
    let [rw, rh] = config.resolution;
    let g = config.ghost_margin;
    let (dw, dh) = (target.width(), target.height());
    let span = |t: u32, n: u32, r: u32| t * d..if t + 1 == n { r } else { (t + 1) * d };
    for ty in 0..dh {
        for tx in 0..dw {
            let xs = span(tx, dw, rw);
            let wet = span(ty, dh, rh)
                .any(|y| xs.clone().any(|x| depth(x + g, y + g) > seed_depth));
            let value = if wet {
                texel_uv(tx, ty, dw, dh).to_array()
            } else {
                NO_SEED
            };
            target.set(tx, ty, 0, value);
        }
    }
}

fn propagate(read: &SeedField, write: &mut SeedField, stride: i64, scale: Vec2) {
    let (w, h) = (read.width(), read.height());
    for ty in 0..h {
        for tx in 0..w {
            let p = texel_uv(tx, ty, w, h);
            let mut best: Option<(f32, [f32; 2])> = None;
            for oy in [-stride, 0, stride] {
                for ox in [-stride, 0, stride] {
                    let (nx, ny) = (i64::from(tx) + ox, i64::from(ty) + oy);
                    if !read.in_bounds(nx, ny) {
                        continue;
                    }
                    let s = read.get(nx as u32, ny as u32, 0);
                    if s[0].is_nan() {
                        continue;
                    }
                    let d2 = ((Vec2::from(s) - p) * scale).length_squared();
                    if best.is_none_or(|(bd, _)| d2 < bd) {
                        best = Some((d2, s));
                    }
                }
            }
            write.set(tx, ty, 0, best.map_or(NO_SEED, |(_, s)| s));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_compute::{KernelTable, Kernels, SoftwareBackend};

    fn grid_with_distance(res: u32, downsample: u32, backend: &mut SoftwareBackend) -> SimulationGrid {
        let mut config = GridConfig::new(res, res as f32);
        config.distance_downsample = Some(downsample);
        SimulationGrid::init(&config, backend).unwrap()
    }

    #[test]
    fn iteration_count_is_ceil_log2() {
        assert_eq!(iteration_count(16, 8, 8), 3);
        assert_eq!(iteration_count(16, 9, 4), 4);
        assert_eq!(iteration_count(16, 1, 1), 0);
        assert_eq!(iteration_count(2, 1024, 4), 2);
    }

    #[test]
    fn single_seed_converges_exactly() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut grid = grid_with_distance(8, 1, &mut backend);
        let g = grid.ghost_margin();
        grid.height.active_mut().set(g + 5, g + 2, 0, 1.0);

        let mut stream = CommandStream::new(&mut backend, &kernels);
        let passes = JumpFlood::new(16).run(&mut grid, &mut stream);
        drop(stream);
        assert_eq!(passes, 3);
        assert_eq!(backend.dispatch_count(kernels.jump_flood_step), 3);

        let expected = texel_uv(5, 2, 8, 8).to_array();
        let field = grid.distance.as_ref().unwrap().active();
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(field.get(x, y, 0), expected, "texel ({x}, {y})");
            }
        }
    }

    #[test]
    fn nearest_of_two_seeds_wins() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut grid = grid_with_distance(8, 1, &mut backend);
        let g = grid.ghost_margin();
        grid.height.active_mut().set(g, g, 0, 1.0);
        grid.height.active_mut().set(g + 7, g + 7, 0, 1.0);

        let mut stream = CommandStream::new(&mut backend, &kernels);
        JumpFlood::default().run(&mut grid, &mut stream);
        let field = grid.distance.as_ref().unwrap().active();
        assert_eq!(field.get(1, 1, 0), texel_uv(0, 0, 8, 8).to_array());
        assert_eq!(field.get(6, 6, 0), texel_uv(7, 7, 8, 8).to_array());
    }

    #[test]
    fn dry_tile_has_no_seeds() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut grid = grid_with_distance(8, 2, &mut backend);
        let mut stream = CommandStream::new(&mut backend, &kernels);
        JumpFlood::default().run(&mut grid, &mut stream);
        let field = grid.distance.as_ref().unwrap().active();
        assert!(field.data().iter().all(|s| s[0].is_nan()));
        assert_eq!(seed_world(&grid.bounds(), field.get(0, 0, 0)), None);
    }

    #[test]
    fn downsampled_seed_maps_back_to_world() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        // 8 cells over 8 world units, downsample 2 -> 4x4 texels of 2 units.
        let mut grid = grid_with_distance(8, 2, &mut backend);
        let g = grid.ghost_margin();
        grid.height.active_mut().set(g + 7, g, 0, 1.0);
        let mut stream = CommandStream::new(&mut backend, &kernels);
        JumpFlood::default().run(&mut grid, &mut stream);
        let field = grid.distance.as_ref().unwrap().active();
        let world = seed_world(&grid.bounds(), field.get(0, 3, 0)).unwrap();
        assert_eq!(world, Vec2::new(3.0, -3.0));
    }

    #[test]
    fn no_distance_field_is_a_no_op() {
        let mut backend = SoftwareBackend::new();
        let mut table = KernelTable::new();
        let kernels = Kernels::resolve(&mut table);
        let mut grid = SimulationGrid::init(&GridConfig::new(8, 8.0), &mut backend).unwrap();
        let mut stream = CommandStream::new(&mut backend, &kernels);
        assert_eq!(JumpFlood::default().run(&mut grid, &mut stream), 0);
    }
}
