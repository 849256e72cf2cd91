//! The 64-bit packed cell record shared by the composite render field
//! and the host readback mirror.
//!
//! # Layout
//!
//! ```text
//! bits  0..16  total height, binary16, relative to the tile's world Y
//! bits 16..32  signed depth, binary16 (sign bit = dominant layer)
//! bits 32..48  world-space velocity X, binary16
//! bits 48..64  world-space velocity Z, binary16
//! ```
//!
//! The height is stored relative to a cached world-space Y offset so that
//! tiles placed far from the origin keep full half-float precision near
//! their surface; [`PackedCell::decode`] adds the offset back.

use glam::Vec2;

use crate::half::{f16_bits_to_f32, f32_to_f16_bits};

/// One of the two stacked fluid layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FluidLayer {
    /// The base layer (layer index 0).
    Primary,
    /// The optional second layer (layer index 1).
    Secondary,
}

impl FluidLayer {
    /// Channel index of this layer in a height field.
    pub fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }

    /// Layer for a channel index. Anything past 0 is the second layer.
    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            Self::Primary
        } else {
            Self::Secondary
        }
    }
}

/// A decoded cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSample {
    /// Total surface height in world space (terrain plus fluid).
    pub height: f32,
    /// Signed fluid depth. Negative when the second layer dominates.
    pub depth: f32,
    /// Horizontal velocity in world space (x, z).
    pub velocity: Vec2,
}

impl CellSample {
    /// Unsigned fluid depth.
    pub fn fluid_depth(&self) -> f32 {
        self.depth.abs()
    }

    /// The layer flagged as dominant by the depth sign.
    pub fn dominant_layer(&self) -> FluidLayer {
        if self.depth.is_sign_negative() {
            FluidLayer::Secondary
        } else {
            FluidLayer::Primary
        }
    }
}

/// Bit-exact 64-bit cell record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PackedCell(pub u64);

impl PackedCell {
    /// Pack a cell. `height` is relative to the tile's world Y.
    ///
    /// Each component saturates to the finite half-float range; NaN
    /// components encode as zero.
    pub fn encode(height: f32, depth: f32, velocity: Vec2) -> Self {
        let h = u64::from(f32_to_f16_bits(height));
        let d = u64::from(f32_to_f16_bits(depth));
        let vx = u64::from(f32_to_f16_bits(velocity.x));
        let vz = u64::from(f32_to_f16_bits(velocity.y));
        Self(h | (d << 16) | (vx << 32) | (vz << 48))
    }

    /// Pack a cell from per-layer depths.
    ///
    /// The total height is `terrain + depths[0] + depths[1]`. The stored
    /// depth is the summed depth, negated when the second layer is
    /// strictly deeper than the first.
    pub fn compose(terrain: f32, depths: [f32; 2], velocity: Vec2) -> Self {
        let total_depth = depths[0] + depths[1];
        let signed = if depths[1] > depths[0] {
            -total_depth
        } else {
            total_depth
        };
        Self::encode(terrain + total_depth, signed, velocity)
    }

    /// Unpack a cell, adding `world_y_offset` back onto the height.
    pub fn decode(self, world_y_offset: f32) -> CellSample {
        CellSample {
            height: self.local_height() + world_y_offset,
            depth: self.depth(),
            velocity: self.velocity(),
        }
    }

    /// Height relative to the tile's world Y.
    pub fn local_height(self) -> f32 {
        f16_bits_to_f32(self.0 as u16)
    }

    /// Signed depth.
    pub fn depth(self) -> f32 {
        f16_bits_to_f32((self.0 >> 16) as u16)
    }

    /// Velocity (x, z).
    pub fn velocity(self) -> Vec2 {
        Vec2::new(
            f16_bits_to_f32((self.0 >> 32) as u16),
            f16_bits_to_f32((self.0 >> 48) as u16),
        )
    }

    /// Dominant layer, read from the depth sign bit alone.
    ///
    /// A stored `-0.0` therefore reports [`FluidLayer::Secondary`]; the
    /// depth magnitude is never consulted.
    pub fn dominant_layer(self) -> FluidLayer {
        if (self.0 >> 31) & 1 == 1 {
            FluidLayer::Secondary
        } else {
            FluidLayer::Primary
        }
    }

    /// Little-endian byte representation.
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Rebuild from little-endian bytes.
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}
