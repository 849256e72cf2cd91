//! Per-step modifier application.

use std::ops::Range;

use glam::Vec2;
use shoal_compute::{workgroups, CommandStream};
use shoal_core::WorldBounds;
use shoal_grid::{GridConfig, SimulationGrid};

use crate::bake::apply_static;
use crate::model::{BlendMode, HeightSpace, Modifier, ModifierKind, Phase};
use crate::registry::ModifierRegistry;

/// Depth below which a Force has nothing to push.
pub const MIN_FORCE_DEPTH: f32 = 1e-4;

/// Counters from one [`apply_phase`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InjectStats {
    /// Modifiers that wrote to the grid.
    pub applied: u32,
    /// Modifiers skipped as invalid (non-finite direction, zero falloff,
    /// missing layer, ...).
    pub skipped: u32,
    /// Modifiers whose footprint misses the tile.
    pub culled: u32,
}

impl std::ops::AddAssign for InjectStats {
    fn add_assign(&mut self, rhs: Self) {
        self.applied += rhs.applied;
        self.skipped += rhs.skipped;
        self.culled += rhs.culled;
    }
}

/// Padded-space interior cell ranges overlapped by `bounds`.
pub(crate) fn cell_region(config: &GridConfig, bounds: &WorldBounds) -> Option<(Range<u32>, Range<u32>)> {
    let interior = config.bounds();
    if !interior.intersects(bounds) {
        return None;
    }
    let cell = config.cell_size();
    let lo = ((bounds.min - interior.min) / cell).floor();
    let hi = ((bounds.max - interior.min) / cell).ceil();
    let [rw, rh] = config.resolution;
    let g = config.ghost_margin;
    let clamp = |v: f32, max: u32| -> u32 { v.clamp(0.0, max as f32) as u32 };
    let xs = g + clamp(lo.x, rw)..g + clamp(hi.x, rw);
    let ys = g + clamp(lo.y, rh)..g + clamp(hi.y, rh);
    if xs.is_empty() || ys.is_empty() {
        return None;
    }
    Some((xs, ys))
}

/// Blend `current` towards `target` by `w` under a clamp mode.
fn blend_towards(mode: BlendMode, current: f32, target: f32, w: f32) -> f32 {
    let blended = current * (1.0 - w) + target * w;
    match mode {
        BlendMode::Minimum => current.min(blended),
        BlendMode::Maximum => current.max(blended),
        _ => blended,
    }
}

fn damping_factor(strength: f32, w: f32, dt: f32) -> f32 {
    (1.0 - strength * w * dt).clamp(0.0, 1.0)
}

/// Apply every modifier registered for `phase` to `grid`'s active
/// buffers.
///
/// The pre phase first adds the baked static input. When the grid
/// carries an injection buffer (no float blending on the backend),
/// additive writes accumulate there and are resolved in one extra pass;
/// the result matches the direct path up to summation order. Negative
/// depths left by additive sinks are clamped to zero at the end of the
/// pre phase.
pub fn apply_phase(
    registry: &ModifierRegistry,
    phase: Phase,
    grid: &mut SimulationGrid,
    dt: f32,
    stream: &mut CommandStream<'_>,
) -> InjectStats {
    let mut stats = InjectStats::default();
    if phase == Phase::Pre {
        apply_static(grid, dt, stream);
    }
    let via_injection = phase == Phase::Pre && grid.injection.is_some();
    if via_injection {
        if let Some(inj) = grid.injection.as_mut() {
            inj.fill(0.0);
        }
    }
    let kernel = match phase {
        Phase::Pre => stream.kernels().inject_pre,
        Phase::Post => stream.kernels().inject_post,
    };
    for (id, m) in registry.in_phase(phase) {
        if let Some(reason) = m.skip_reason() {
            log::debug!("modifier {id} skipped: {reason}");
            stats.skipped += 1;
            continue;
        }
        if let ModifierKind::Source { layer, .. } = m.kind {
            if layer.index() as u32 >= grid.layers() {
                log::debug!("modifier {id} skipped: tile has no {layer:?} layer");
                stats.skipped += 1;
                continue;
            }
        }
        let Some((xs, ys)) = cell_region(grid.config(), &m.bounds()) else {
            stats.culled += 1;
            continue;
        };
        let groups = workgroups(xs.len() as u32, ys.len() as u32);
        stream.dispatch(kernel, groups, || write_modifier(m, grid, xs, ys, dt, via_injection));
        stats.applied += 1;
    }
    if phase == Phase::Pre {
        let kernel = stream.kernels().inject_pre;
        let [w, h] = grid.padded();
        stream.dispatch(kernel, workgroups(w, h), || resolve_pre(grid));
    }
    log::trace!(
        "{phase:?} injection: {} applied, {} skipped, {} culled",
        stats.applied,
        stats.skipped,
        stats.culled
    );
    stats
}

fn write_modifier(
    m: &Modifier,
    grid: &mut SimulationGrid,
    xs: Range<u32>,
    ys: Range<u32>,
    dt: f32,
    via_injection: bool,
) {
    let config = grid.config().clone();
    let layers = config.layers;
    for y in ys {
        for x in xs.clone() {
            let p = config.cell_center(x, y);
            let w = m.weight_at(p);
            if w <= 0.0 {
                continue;
            }
            match &m.kind {
                ModifierKind::Source { layer, space } => {
                    let li = layer.index() as u32;
                    match m.blend {
                        BlendMode::Additive => {
                            let delta = m.strength * w * dt;
                            match grid.injection.as_mut().filter(|_| via_injection) {
                                Some(inj) => inj.cell_mut(x, y)[li as usize] += delta,
                                None => grid.height.active_mut().cell_mut(x, y)[li as usize] += delta,
                            }
                        }
                        BlendMode::Dampen => {
                            let f = damping_factor(m.strength, w, dt);
                            grid.height.active_mut().cell_mut(x, y)[li as usize] *= f;
                        }
                        mode => {
                            let offset = match space {
                                HeightSpace::WorldHeight => config.world_y,
                                HeightSpace::LocalHeight => 0.0,
                            };
                            let cell = grid.height.active().cell(x, y);
                            let below: f32 = grid.terrain.active().get(x, y, 0)
                                + cell[..li as usize].iter().sum::<f32>();
                            let target = (m.strength - offset - below).max(0.0);
                            let current = cell[li as usize];
                            let value = blend_towards(mode, current, target, w);
                            grid.height.active_mut().set(x, y, li, value);
                        }
                    }
                }
                ModifierKind::Flow(pattern) | ModifierKind::Force(pattern) => {
                    let dir = pattern.direction(m.local(p));
                    let is_force = matches!(m.kind, ModifierKind::Force(_));
                    match m.blend {
                        BlendMode::Additive => {
                            let mut accel = dir * m.strength;
                            if is_force {
                                let depth: f32 = grid.height.active().cell(x, y).iter().sum();
                                if depth < MIN_FORCE_DEPTH {
                                    continue;
                                }
                                accel /= depth;
                            }
                            let delta = accel * w * dt;
                            match grid.injection.as_mut().filter(|_| via_injection) {
                                Some(inj) => {
                                    let c = inj.cell_mut(x, y);
                                    c[layers as usize] += delta.x;
                                    c[layers as usize + 1] += delta.y;
                                }
                                None => {
                                    let c = grid.velocity.active_mut().cell_mut(x, y);
                                    c[0] += delta.x;
                                    c[1] += delta.y;
                                }
                            }
                        }
                        BlendMode::Dampen => {
                            let f = damping_factor(m.strength, w, dt);
                            for v in grid.velocity.active_mut().cell_mut(x, y) {
                                *v *= f;
                            }
                        }
                        mode => {
                            let target = dir * m.strength;
                            let c = grid.velocity.active_mut().cell_mut(x, y);
                            let v = Vec2::new(
                                blend_towards(mode, c[0], target.x, w),
                                blend_towards(mode, c[1], target.y, w),
                            );
                            c[0] = v.x;
                            c[1] = v.y;
                        }
                    }
                }
            }
        }
    }
}

/// Fold any injection buffer into height and velocity, then clamp
/// negative depths.
fn resolve_pre(grid: &mut SimulationGrid) {
    let layers = grid.layers() as usize;
    let [w, h] = grid.padded();
    if let Some(inj) = grid.injection.as_ref() {
        let height = grid.height.active_mut();
        let velocity = grid.velocity.active_mut();
        for y in 0..h {
            for x in 0..w {
                let add = inj.cell(x, y);
                for (d, a) in height.cell_mut(x, y).iter_mut().zip(&add[..layers]) {
                    *d += a;
                }
                for (v, a) in velocity.cell_mut(x, y).iter_mut().zip(&add[layers..]) {
                    *v += a;
                }
            }
        }
    }
    for d in grid.height.active_mut().data_mut() {
        if *d < 0.0 || d.is_nan() {
            *d = 0.0;
        }
    }
}
