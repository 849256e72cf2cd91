//! Asynchronous device-to-host readback for Shoal.
//!
//! Two fields are mirrored to host memory: the packed surface composite
//! and the jump-flood distance field. Both use the same pattern. A
//! [`MirrorPipeline`] issues one band of rows at a time, chosen
//! round-robin by its [`ReadbackSlice`]. The completion arrives on a
//! later frame over a crossbeam channel and is copied into a
//! [`HostMirror`]. At most one request per field is in flight. A
//! backend without asynchronous readback is flushed right after the
//! request, so its band lands in the mirror within the same call.
//!
//! ```text
//!   request()          poll() on a later frame        receive()
//!  ───────────▶ backend ─────────────────────▶ channel ─────────▶ HostMirror
//!  band s of N                                          band s ready, s = (s+1) % N
//! ```
//!
//! A failed transfer clears the in-flight flag without advancing, so
//! the same band is retried next frame. Reallocating the source bumps
//! the pipeline's generation; completions from an older generation are
//! dropped.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod jump_flood;
pub mod mirror;
pub mod pipeline;
pub mod slice;

pub use jump_flood::{iteration_count, seed_world, JumpFlood, MIN_SEED_DEPTH, NO_SEED};
pub use mirror::{HostMirror, MirrorElement};
pub use pipeline::{MirrorPipeline, PipelineStats};
pub use slice::ReadbackSlice;
