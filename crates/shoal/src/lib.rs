//! Shoal: tiled heightfield fluid simulation.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Shoal sub-crates. For most users, adding `shoal` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use shoal::prelude::*;
//!
//! let mut settings = Settings {
//!     resolution: [16, 16],
//!     dimension: [16.0, 16.0],
//!     step_duration: 0.25,
//!     ..Settings::default()
//! };
//! settings.readback.timeslices = 1;
//! let mut world = FluidWorld::with_software(settings);
//! let tile = world.add_tile([0, 0], 0.0, None).unwrap();
//! world
//!     .modifiers_mut()
//!     .register(Modifier::source(Vec2::ZERO, Vec2::splat(4.0), 2.0));
//!
//! let metrics = world.advance(0.25).unwrap();
//! assert_eq!(metrics.steps_run, 1);
//! // The surface mirror arrives one frame after it is requested.
//! world.advance(0.25).unwrap();
//! assert!(world.tile(tile).unwrap().depth_at(Vec2::ZERO).unwrap() > 0.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `shoal-core` | IDs, bounds, textures, packed cell codec |
//! | [`compute`] | `shoal-compute` | Backend trait, software backend, kernels, command streams |
//! | [`grid`] | `shoal-grid` | Per-tile buffers, terrain, obstacles, composite, persistence |
//! | [`boundary`] | `shoal-boundary` | Tile topology and ghost-cell exchange |
//! | [`modifier`] | `shoal-modifier` | Sources, flows, forces and their registry |
//! | [`readback`] | `shoal-readback` | Timesliced host mirrors and the jump-flood distance field |
//! | [`engine`] | `shoal-engine` | Settings, clock, solver seam and the multi-tile world |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`shoal-core`).
///
/// Contains tile and modifier IDs, [`types::WorldBounds`], textures and
/// the [`types::PackedCell`] render codec.
pub use shoal_core as types;

/// Compute backends (`shoal-compute`).
///
/// [`compute::ComputeBackend`] is the device seam;
/// [`compute::SoftwareBackend`] runs every kernel on the host.
pub use shoal_compute as compute;

/// Per-tile buffers (`shoal-grid`).
pub use shoal_grid as grid;

/// Tile topology and boundary exchange (`shoal-boundary`).
pub use shoal_boundary as boundary;

/// Modifiers (`shoal-modifier`).
pub use shoal_modifier as modifier;

/// Asynchronous readback (`shoal-readback`).
pub use shoal_readback as readback;

/// The multi-tile world (`shoal-engine`).
///
/// [`engine::FluidWorld`] is the entry point; [`engine::Solver`] is the
/// extension point for user-defined integration.
pub use shoal_engine as engine;

/// Common imports for typical Shoal usage.
///
/// ```rust
/// use shoal::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use shoal_core::{CellSample, FluidLayer, PackedCell, TileId, Vec2, Vec3, WorldBounds};

    // Backends
    pub use shoal_compute::{ComputeBackend, SoftwareBackend};

    // Grid inputs
    pub use shoal_grid::{BoxObstacle, CircleObstacle, ResetMask, Terrain, TerrainSource};

    // Topology
    pub use shoal_boundary::BoundarySide;

    // Modifiers
    pub use shoal_modifier::{BlendMode, FlowPattern, HeightSpace, Modifier, ModifierShape};

    // Engine
    pub use shoal_engine::{
        FluidWorld, FrameMetrics, Settings, Simulation, SimulationKind, SolveContext, Solver,
        SolverError, WorldError,
    };
}
