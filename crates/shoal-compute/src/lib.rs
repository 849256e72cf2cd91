//! Compute backend interface for Shoal.
//!
//! The simulation core never talks to a graphics API directly. Everything
//! it issues (kernel dispatches, buffer copies, asynchronous readbacks)
//! goes through the narrow [`ComputeBackend`] trait, in submission order.
//! A concrete graphics API is one implementation; [`SoftwareBackend`]
//! is another, executing on the CPU and completing readbacks on a later
//! frame so the asynchronous paths stay honest under test.
//!
//! # Ordering
//!
//! Backends execute commands in the order they are issued. The core
//! relies on this (not on CPU-side locking) to keep the buffer swap and
//! ghost-ring exchange of a step from tearing.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod kernel;
pub mod software;
pub mod stream;

pub use backend::{
    BufferDesc, BufferHandle, Capabilities, ComputeBackend, ReadbackCompletion, ReadbackField,
    ReadbackPayload, ReadbackRequest,
};
pub use error::BackendError;
pub use kernel::{KernelId, KernelTable, Kernels};
pub use software::{BackendStats, SoftwareBackend};
pub use stream::{workgroups, CommandStream};
