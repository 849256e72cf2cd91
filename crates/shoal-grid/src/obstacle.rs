//! Obstacles and their rasterization into the obstacle buffer.
//!
//! The obstacle buffer is rebuilt only when the owning [`ObstacleSet`]
//! reports a change (an obstacle moved, was added, removed, enabled,
//! disabled, or a refresh was forced). Each enabled obstacle contributes
//! exactly one draw dispatch.

use glam::Vec2;
use indexmap::IndexMap;
use shoal_compute::{workgroups, CommandStream};
use shoal_core::{ObstacleId, WorldBounds};

use crate::grid::SimulationGrid;

/// Something that blocks fluid flow.
pub trait Obstacle: Send + Sync {
    /// Horizontal extent in world space.
    fn bounds(&self) -> WorldBounds;

    /// World-space top height at `p`, or `None` where the obstacle does
    /// not cover `p`.
    fn height_at(&self, p: Vec2) -> Option<f32>;
}

/// An axis-aligned box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxObstacle {
    /// Horizontal extent.
    pub bounds: WorldBounds,
    /// World-space top height.
    pub top: f32,
}

impl Obstacle for BoxObstacle {
    fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    fn height_at(&self, p: Vec2) -> Option<f32> {
        self.bounds.contains(p).then_some(self.top)
    }
}

/// A vertical cylinder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleObstacle {
    /// Centre (x, z).
    pub center: Vec2,
    /// Radius.
    pub radius: f32,
    /// World-space top height.
    pub top: f32,
}

impl Obstacle for CircleObstacle {
    fn bounds(&self) -> WorldBounds {
        WorldBounds::from_center_size(self.center, Vec2::splat(self.radius * 2.0))
    }

    fn height_at(&self, p: Vec2) -> Option<f32> {
        (p.distance_squared(self.center) <= self.radius * self.radius).then_some(self.top)
    }
}

struct Entry {
    obstacle: Box<dyn Obstacle>,
    enabled: bool,
}

/// Registry of obstacles with a change flag.
pub struct ObstacleSet {
    entries: IndexMap<ObstacleId, Entry>,
    next_id: u64,
    changed: bool,
}

impl ObstacleSet {
    /// An empty set.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            next_id: 0,
            changed: false,
        }
    }

    /// Register an enabled obstacle.
    pub fn add(&mut self, obstacle: impl Obstacle + 'static) -> ObstacleId {
        let id = ObstacleId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            Entry {
                obstacle: Box::new(obstacle),
                enabled: true,
            },
        );
        self.changed = true;
        id
    }

    /// Deregister an obstacle. Returns whether it was present.
    pub fn remove(&mut self, id: ObstacleId) -> bool {
        let removed = self.entries.shift_remove(&id).is_some();
        self.changed |= removed;
        removed
    }

    /// Enable or disable an obstacle.
    pub fn set_enabled(&mut self, id: ObstacleId, enabled: bool) {
        if let Some(e) = self.entries.get_mut(&id) {
            if e.enabled != enabled {
                e.enabled = enabled;
                self.changed = true;
            }
        }
    }

    /// Mutable access to an obstacle, e.g. to move it. Marks the set
    /// changed.
    pub fn get_mut(&mut self, id: ObstacleId) -> Option<&mut (dyn Obstacle + 'static)> {
        let entry = self.entries.get_mut(&id)?;
        self.changed = true;
        Some(entry.obstacle.as_mut())
    }

    /// Replace an obstacle in place. Returns whether it was present.
    pub fn replace(&mut self, id: ObstacleId, obstacle: impl Obstacle + 'static) -> bool {
        match self.entries.get_mut(&id) {
            Some(e) => {
                e.obstacle = Box::new(obstacle);
                self.changed = true;
                true
            }
            None => false,
        }
    }

    /// Force a redraw on the next step.
    pub fn force_refresh(&mut self) {
        self.changed = true;
    }

    /// Whether a redraw is pending.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Read and clear the change flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Number of registered obstacles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enabled obstacles in registration order.
    pub fn enabled(&self) -> impl Iterator<Item = (ObstacleId, &dyn Obstacle)> {
        self.entries
            .iter()
            .filter(|(_, e)| e.enabled)
            .map(|(id, e)| (*id, e.obstacle.as_ref()))
    }
}

impl Default for ObstacleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationGrid {
    /// Redraw the obstacle buffer from `set`, then swap it in.
    ///
    /// Issues one clear and one draw per enabled obstacle overlapping the
    /// tile. Heights are stored relative to world Y, taking the maximum
    /// where obstacles overlap.
    pub fn draw_obstacles(&mut self, set: &ObstacleSet, stream: &mut CommandStream<'_>) {
        let [w, h] = self.padded();
        let config = self.config().clone();
        let padded_bounds = config.padded_bounds();
        let target = self.obstacle.next_mut();
        target.fill(0.0);
        let kernel = stream.kernels().obstacle_draw;
        let mut drawn = 0usize;
        for (_, obstacle) in set.enabled() {
            if !obstacle.bounds().intersects(&padded_bounds) {
                continue;
            }
            drawn += 1;
            stream.dispatch(kernel, workgroups(w, h), || {
                for y in 0..h {
                    for x in 0..w {
                        if let Some(top) = obstacle.height_at(config.cell_center(x, y)) {
                            let local = (top - config.world_y).max(0.0);
                            let cur = target.get(x, y, 0);
                            target.set(x, y, 0, cur.max(local));
                        }
                    }
                }
            });
        }
        log::trace!("obstacle buffer redrawn with {drawn} draw(s)");
        self.obstacle.swap();
    }
}
