//! Simulation grid state for Shoal.
//!
//! One [`SimulationGrid`] per tile owns every per-cell buffer the
//! simulation touches. Buffers that the solver reads and writes in the
//! same step come in active/next pairs ([`PingPong`]); a step ends with
//! an atomic [`swap`](SimulationGrid::swap), never a partial one.
//!
//! # Layout
//!
//! ```text
//! SimulationGrid
//! ├── height     PingPong<FieldBuffer>   1 or 2 channels (fluid layers)
//! ├── velocity   PingPong<FieldBuffer>   2 channels (x, z)
//! ├── terrain    PingPong<FieldBuffer>   1 channel, rebaked on change
//! ├── obstacle   PingPong<FieldBuffer>   1 channel, redrawn on change
//! ├── composite  PingPong<PackedField>   active = current, other = previous
//! ├── normals    FieldBuffer             3 channels, derived
//! ├── static_input FieldBuffer           baked static sources (per second)
//! ├── injection  Option<FieldBuffer>     fallback when float blending is missing
//! └── distance   Option<PingPong<SeedField>>  jump-flood ping-pong pair
//! ```
//!
//! Every buffer is padded by `ghost_margin` cells on each side. Cell
//! `(x, y)` in a buffer is padded-space: interior cells run from
//! `ghost_margin` to `ghost_margin + resolution - 1`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod grid;
pub mod obstacle;
pub mod persist;
pub mod pingpong;
pub mod render;
pub mod terrain;

pub use buffer::{FieldBuffer, GridBuffer, PackedField, SeedField};
pub use config::GridConfig;
pub use error::{GridError, PersistError};
pub use grid::{ResetMask, SimulationGrid, NORMAL_CHANNELS, VELOCITY_CHANNELS};
pub use obstacle::{BoxObstacle, CircleObstacle, Obstacle, ObstacleSet};
pub use pingpong::PingPong;
pub use terrain::{SurfaceFn, Terrain, TerrainInput, TerrainSource, TriangleMesh};
