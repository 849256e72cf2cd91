//! The modifier model.

use std::sync::Arc;

use glam::Vec2;
use shoal_core::{FluidLayer, Texture, WorldBounds};

use crate::shape::ModifierShape;

/// How a modifier combines with the field it writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Add `strength * weight * dt` (strength is a per-second rate).
    Additive,
    /// Move towards the target by `weight`.
    Set,
    /// Move towards the target by `weight`, never upwards.
    Minimum,
    /// Move towards the target by `weight`, never downwards.
    Maximum,
    /// Scale by `1 - strength * weight * dt`, floored at zero.
    Dampen,
}

/// Which phase of a step a modifier runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the solver integrates.
    Pre,
    /// After the solver integrates and the buffers swap.
    Post,
}

/// Reference height for Source targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeightSpace {
    /// Targets are world-space surface heights; the tile's world Y is
    /// subtracted before comparing with local heights.
    WorldHeight,
    /// Targets are surface heights relative to the tile's world Y.
    LocalHeight,
}

/// Direction field of a Flow or Force.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowPattern {
    /// A constant direction (x, z).
    Directional {
        /// Direction; not normalized, its length scales the effect.
        direction: Vec2,
    },
    /// Swirl around the modifier position.
    Vortex {
        /// Strength towards the centre (negative pushes outwards).
        inward: f32,
        /// Strength counter-clockwise around the centre.
        tangential: f32,
    },
    /// Red/green channels remapped from `[0, 1]` to `[-1, 1]`, stretched
    /// over the footprint.
    Texture(Arc<Texture>),
}

impl FlowPattern {
    /// Direction at normalized footprint offset `q`.
    pub fn direction(&self, q: Vec2) -> Vec2 {
        match self {
            Self::Directional { direction } => *direction,
            Self::Vortex { inward, tangential } => {
                let Some(radial) = q.try_normalize() else {
                    return Vec2::ZERO;
                };
                -radial * *inward + radial.perp() * *tangential
            }
            Self::Texture(tex) => {
                let uv = q * 0.5 + 0.5;
                Vec2::new(tex.sample(uv, 0), tex.sample(uv, 1)) * 2.0 - Vec2::ONE
            }
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Self::Directional { direction } => direction.is_finite(),
            Self::Vortex { inward, tangential } => inward.is_finite() && tangential.is_finite(),
            Self::Texture(_) => true,
        }
    }
}

/// What a modifier writes.
#[derive(Clone, Debug, PartialEq)]
pub enum ModifierKind {
    /// Writes depth of one fluid layer.
    Source {
        /// Target layer.
        layer: FluidLayer,
        /// Reference for Set/Minimum/Maximum targets.
        space: HeightSpace,
    },
    /// Writes velocity directly.
    Flow(FlowPattern),
    /// Accelerates velocity, divided by the local depth.
    Force(FlowPattern),
}

/// One localized effect on the fluid.
#[derive(Clone, Debug, PartialEq)]
pub struct Modifier {
    /// What is written.
    pub kind: ModifierKind,
    /// Footprint.
    pub shape: ModifierShape,
    /// Combination rule.
    pub blend: BlendMode,
    /// Rate (Additive, Dampen) or target (Set, Minimum, Maximum).
    pub strength: f32,
    /// Exponent applied to the distance falloff. Zero disables the
    /// modifier.
    pub falloff: f32,
    /// Centre in world space (x, z).
    pub position: Vec2,
    /// Full footprint size (x, z).
    pub size: Vec2,
    /// Dynamic modifiers are applied every step. A stationary additive
    /// Source is baked into the static input instead.
    pub dynamic: bool,
    /// Disabled modifiers are ignored.
    pub enabled: bool,
}

impl Modifier {
    /// A dynamic additive source into the first layer.
    pub fn source(position: Vec2, size: Vec2, strength: f32) -> Self {
        Self {
            kind: ModifierKind::Source {
                layer: FluidLayer::Primary,
                space: HeightSpace::WorldHeight,
            },
            shape: ModifierShape::Circle,
            blend: BlendMode::Additive,
            strength,
            falloff: 1.0,
            position,
            size,
            dynamic: true,
            enabled: true,
        }
    }

    /// A dynamic directional flow.
    pub fn flow(position: Vec2, size: Vec2, direction: Vec2, strength: f32) -> Self {
        Self {
            kind: ModifierKind::Flow(FlowPattern::Directional { direction }),
            ..Self::source(position, size, strength)
        }
    }

    /// A dynamic force with the given pattern.
    pub fn force(position: Vec2, size: Vec2, pattern: FlowPattern, strength: f32) -> Self {
        Self {
            kind: ModifierKind::Force(pattern),
            ..Self::source(position, size, strength)
        }
    }

    /// Replace the blend mode.
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Replace the shape.
    pub fn with_shape(mut self, shape: ModifierShape) -> Self {
        self.shape = shape;
        self
    }

    /// Replace the falloff exponent.
    pub fn with_falloff(mut self, falloff: f32) -> Self {
        self.falloff = falloff;
        self
    }

    /// Mark as stationary.
    pub fn stationary(mut self) -> Self {
        self.dynamic = false;
        self
    }

    /// Retarget a Source to `layer` in `space`. No effect on other kinds.
    pub fn with_target(mut self, layer: FluidLayer, space: HeightSpace) -> Self {
        if let ModifierKind::Source { .. } = self.kind {
            self.kind = ModifierKind::Source { layer, space };
        }
        self
    }

    /// World-space footprint.
    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::from_center_size(self.position, self.size)
    }

    /// Normalized footprint offset of world point `p`.
    pub fn local(&self, p: Vec2) -> Vec2 {
        (p - self.position) / (self.size * 0.5)
    }

    /// Weight at world point `p`.
    pub fn weight_at(&self, p: Vec2) -> f32 {
        self.shape.weight(self.local(p), self.falloff)
    }

    /// Whether this is a stationary additive Source handled by the
    /// static bake.
    pub fn is_static(&self) -> bool {
        !self.dynamic
            && self.blend == BlendMode::Additive
            && matches!(self.kind, ModifierKind::Source { .. })
    }

    /// Phase for per-step application, or `None` for static sources.
    pub fn phase(&self) -> Option<Phase> {
        if self.is_static() {
            return None;
        }
        match self.blend {
            BlendMode::Additive | BlendMode::Dampen => Some(Phase::Pre),
            BlendMode::Set | BlendMode::Minimum | BlendMode::Maximum => Some(Phase::Post),
        }
    }

    /// Why this modifier must be skipped, if it must.
    ///
    /// Skipping is a no-op, never an error: the modifier simply does not
    /// write that step.
    pub fn skip_reason(&self) -> Option<&'static str> {
        if !self.enabled {
            return Some("disabled");
        }
        if self.falloff == 0.0 || !self.falloff.is_finite() {
            return Some("zero or non-finite falloff");
        }
        if !self.strength.is_finite() {
            return Some("non-finite strength");
        }
        if !self.position.is_finite() || !self.size.is_finite() || self.size.min_element() <= 0.0
        {
            return Some("degenerate footprint");
        }
        match &self.kind {
            ModifierKind::Flow(p) | ModifierKind::Force(p) if !p.is_finite() => {
                Some("non-finite direction")
            }
            _ => None,
        }
    }
}
