//! Multi-tile fluid world for Shoal.
//!
//! Ties the lower crates together: a [`FluidWorld`] owns the backend,
//! a set of [`Simulation`] tiles linked through a lattice topology, the
//! modifier registry and obstacles. A fixed-step [`SimulationClock`]
//! turns frame time into steps, and each step runs injection, the
//! pluggable [`Solver`] and boundary exchange across every tile.
//! Host mirrors filled by asynchronous readback answer CPU queries
//! such as [`Simulation::height_at`] and [`Simulation::nearest_fluid`].
//!
//! Configuration is a single [`Settings`] value, loadable from TOML.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod kind;
pub mod metrics;
mod query;
pub mod simulation;
pub mod solver;
pub mod world;

pub use clock::{FrameSteps, SimulationClock};
pub use config::{
    ConfigError, DistanceFieldSettings, LayerPhysics, ReadbackSettings, SecondLayerSettings,
    Settings,
};
pub use error::WorldError;
pub use kind::{KindParams, SimulationKind, SolverPasses};
pub use metrics::FrameMetrics;
pub use simulation::Simulation;
pub use solver::{IdleSolver, SolveContext, Solver, SolverError};
pub use world::FluidWorld;
