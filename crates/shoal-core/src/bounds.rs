//! World-space extent of a tile on the horizontal (x, z) plane.

use glam::Vec2;

/// Axis-aligned rectangle on the x/z plane.
///
/// `Vec2::x` is world X and `Vec2::y` is world Z throughout Shoal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBounds {
    /// Minimum corner (x, z).
    pub min: Vec2,
    /// Maximum corner (x, z).
    pub max: Vec2,
}

impl WorldBounds {
    /// Bounds from a centre point and a full size.
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Full size along x and z.
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Centre point.
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Whether a point lies inside (inclusive of the min edge, exclusive of max).
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// Map a world point to UV in `[0, 1]` across these bounds.
    pub fn to_uv(&self, p: Vec2) -> Vec2 {
        (p - self.min) / self.size()
    }

    /// Map a UV back to a world point.
    pub fn from_uv(&self, uv: Vec2) -> Vec2 {
        self.min + uv * self.size()
    }

    /// Grow the rectangle by `amount` on every side.
    pub fn expanded(&self, amount: Vec2) -> Self {
        Self {
            min: self.min - amount,
            max: self.max + amount,
        }
    }

    /// Whether two rectangles overlap with positive area.
    pub fn intersects(&self, other: &WorldBounds) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uv_round_trip() {
        let b = WorldBounds::from_center_size(Vec2::new(10.0, -4.0), Vec2::new(8.0, 4.0));
        assert_eq!(b.min, Vec2::new(6.0, -6.0));
        let p = Vec2::new(8.0, -5.0);
        assert_eq!(b.to_uv(p), Vec2::new(0.25, 0.25));
        assert_eq!(b.from_uv(b.to_uv(p)), p);
    }

    #[test]
    fn contains_is_half_open() {
        let b = WorldBounds {
            min: Vec2::ZERO,
            max: Vec2::ONE,
        };
        assert!(b.contains(Vec2::ZERO));
        assert!(!b.contains(Vec2::new(1.0, 0.5)));
    }

    #[test]
    fn touching_rectangles_do_not_intersect() {
        let a = WorldBounds {
            min: Vec2::ZERO,
            max: Vec2::ONE,
        };
        let b = WorldBounds {
            min: Vec2::new(1.0, 0.0),
            max: Vec2::new(2.0, 1.0),
        };
        assert!(!a.intersects(&b));
        assert!(a.expanded(Vec2::splat(0.1)).intersects(&b));
    }
}
