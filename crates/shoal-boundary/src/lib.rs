//! Boundary exchange for Shoal.
//!
//! Independently allocated tiles behave as one continuous fluid body by
//! refreshing their ghost rings from each other every step. The
//! adjacency relation lives in a [`Topology`] and is always symmetric;
//! the copy itself is the two-pass [`BoundaryExchange`]:
//!
//! 1. **Store** every tile's interior strip beside each side into
//!    side-indexed scratch, laid out `[depth][along]` so Left/Right and
//!    Top/Bottom strips share one orientation.
//! 2. **Apply** to each side either the neighbour's opposite strip, the
//!    tile's own strip (closed border) or zeros (open border).
//!
//! Storing everything before applying anything means the result does not
//! depend on tile iteration order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;
pub mod exchange;
pub mod side;
pub mod topology;

pub use cluster::Links;
pub use error::TopologyError;
pub use exchange::{BoundaryExchange, ExchangeField, Strip};
pub use side::BoundarySide;
pub use topology::{LatticeCoord, Topology};
