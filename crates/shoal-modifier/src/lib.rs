//! Modifier injection for Shoal.
//!
//! A [`Modifier`] is a localized effect on the fluid: a [`Source`]
//! adds, removes or clamps depth, a [`Flow`] pushes velocity directly and
//! a [`Force`] accelerates it in proportion to the local depth. Each has
//! a [`ModifierShape`], a [`BlendMode`], a strength and a falloff.
//!
//! Modifiers live in an explicit, ordered [`ModifierRegistry`] owned by
//! the simulation and are applied in two phases around the solver:
//!
//! | Phase | Applies |
//! |-------|---------|
//! | [`Phase::Pre`] | Additive and Dampen modifiers, plus the baked static input |
//! | [`Phase::Post`] | Set, Minimum and Maximum modifiers |
//!
//! Running clamps after integration means that step's flux update
//! cannot overwrite them. Stationary additive sources are baked once
//! into the grid's static input buffer and added every step.
//!
//! [`Source`]: ModifierKind::Source
//! [`Flow`]: ModifierKind::Flow
//! [`Force`]: ModifierKind::Force

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bake;
pub mod inject;
pub mod model;
pub mod registry;
pub mod shape;

pub use bake::{apply_static, bake_static};
pub use inject::{apply_phase, InjectStats};
pub use model::{BlendMode, FlowPattern, HeightSpace, Modifier, ModifierKind, Phase};
pub use registry::ModifierRegistry;
pub use shape::ModifierShape;
