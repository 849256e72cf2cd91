//! Core types for the Shoal heightfield fluid simulation.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers, world-space geometry, sampled textures, and the
//! bit-exact [`PackedCell`] codec shared by every other Shoal crate.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bounds;
pub mod half;
pub mod id;
pub mod packed;
pub mod texture;

pub use bounds::WorldBounds;
pub use id::{ModifierId, ObstacleId, ReadbackGeneration, StepId, TileId};
pub use packed::{CellSample, FluidLayer, PackedCell};
pub use texture::{Texture, UvTransform};

pub use glam::{Vec2, Vec3};
