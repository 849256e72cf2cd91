//! Modifier footprints and falloff weights.

use std::sync::Arc;

use glam::Vec2;
use shoal_core::Texture;

/// Footprint of a modifier in its own normalized space.
///
/// The footprint spans `position ± size / 2`. A point's normalized
/// offset `q` runs from -1 to 1 across the footprint.
#[derive(Clone, Debug, PartialEq)]
pub enum ModifierShape {
    /// Ellipse inscribed in the footprint; distance is `|q|`.
    Circle,
    /// The whole footprint; distance is `max(|q.x|, |q.y|)`.
    Box,
    /// Channel 0 of a texture stretched over the footprint gives the
    /// coverage directly.
    Texture(Arc<Texture>),
}

impl ModifierShape {
    /// Weight in `[0, 1]` at normalized offset `q`.
    ///
    /// Circle and Box weights are `(1 - distance)^falloff`, zero at and
    /// beyond the edge. Texture coverage is clamped to `[0, 1]` and then
    /// raised to `falloff`.
    pub fn weight(&self, q: Vec2, falloff: f32) -> f32 {
        let base = match self {
            Self::Circle => 1.0 - q.length(),
            Self::Box => 1.0 - q.x.abs().max(q.y.abs()),
            Self::Texture(tex) => {
                if q.x.abs() > 1.0 || q.y.abs() > 1.0 {
                    return 0.0;
                }
                tex.sample(q * 0.5 + 0.5, 0).clamp(0.0, 1.0)
            }
        };
        if base <= 0.0 || !base.is_finite() {
            return 0.0;
        }
        base.powf(falloff).min(1.0)
    }
}
