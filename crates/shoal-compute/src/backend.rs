//! The [`ComputeBackend`] trait and the request/completion types it moves.

use std::ops::Range;

use crossbeam_channel::Sender;
use shoal_core::{PackedCell, ReadbackGeneration, TileId};

use crate::error::BackendError;
use crate::kernel::KernelId;

/// Opaque handle to a device allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Description of a buffer to allocate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferDesc {
    /// Debug label, reported in allocation failures.
    pub label: String,
    /// Size in bytes.
    pub bytes: usize,
}

impl BufferDesc {
    /// Describe a buffer of `elements` values of type `T`.
    pub fn of<T>(label: impl Into<String>, elements: usize) -> Self {
        Self {
            label: label.into(),
            bytes: elements.saturating_mul(std::mem::size_of::<T>()),
        }
    }
}

/// Optional platform features. Missing features select alternate paths,
/// never failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Readbacks complete asynchronously on a later frame. Without it,
    /// callers flush right after requesting and read the result at once.
    pub async_readback: bool,
    /// Render targets support additive blending of `f32` values. Without
    /// it, additive injections go through an extra input buffer.
    pub float_blend: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            async_readback: true,
            float_blend: true,
        }
    }
}

/// Which mirrored field a readback belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadbackField {
    /// Packed height/depth/velocity composite.
    Surface,
    /// Jump-flood nearest-fluid UV field.
    Distance,
}

/// Row data moved by a readback.
#[derive(Clone, Debug, PartialEq)]
pub enum ReadbackPayload {
    /// Packed composite cells.
    Cells(Vec<PackedCell>),
    /// Nearest-seed UV pairs. `[NaN, NaN]` marks "no fluid found".
    Seeds(Vec<[f32; 2]>),
}

impl ReadbackPayload {
    /// Number of elements carried.
    pub fn len(&self) -> usize {
        match self {
            Self::Cells(v) => v.len(),
            Self::Seeds(v) => v.len(),
        }
    }

    /// Whether the payload carries no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A request to transfer a band of rows from device to host.
///
/// The payload is captured when the request is issued, matching the
/// in-order semantics of a device copy; the completion is delivered
/// on `reply` no earlier than the next frame.
#[derive(Debug)]
pub struct ReadbackRequest {
    /// Tile that owns the source buffer.
    pub tile: TileId,
    /// Which mirrored field.
    pub field: ReadbackField,
    /// Generation of the destination mirror at issue time.
    pub generation: ReadbackGeneration,
    /// Row band covered by this request.
    pub rows: Range<u32>,
    /// Source rows.
    pub payload: ReadbackPayload,
    /// Where the completion is delivered.
    pub reply: Sender<ReadbackCompletion>,
}

/// Completion of a [`ReadbackRequest`].
#[derive(Debug)]
pub struct ReadbackCompletion {
    /// Tile the request was issued for.
    pub tile: TileId,
    /// Which mirrored field.
    pub field: ReadbackField,
    /// Generation copied from the request.
    pub generation: ReadbackGeneration,
    /// Row band copied from the request.
    pub rows: Range<u32>,
    /// Transferred data, or the transfer error.
    pub result: Result<ReadbackPayload, BackendError>,
}

/// Narrow interface between the simulation core and a compute device.
///
/// All methods are called from the single control thread. Commands
/// execute in issue order.
pub trait ComputeBackend: Send {
    /// Human-readable backend name for logging.
    fn name(&self) -> &str;

    /// Feature flags for this device.
    fn capabilities(&self) -> Capabilities;

    /// Reserve device memory. Exhaustion is reported, never clamped.
    fn allocate(&mut self, desc: &BufferDesc) -> Result<BufferHandle, BackendError>;

    /// Return an allocation to the budget. Unknown handles are ignored.
    fn release(&mut self, handle: BufferHandle);

    /// Issue a kernel dispatch.
    ///
    /// `work` is the host-visible effect of the kernel. A device backend
    /// records it into its command stream; the software backend runs it
    /// immediately, which preserves issue order.
    fn dispatch(&mut self, kernel: KernelId, groups: [u32; 3], work: &mut dyn FnMut());

    /// Copy `src` into the prefix of `dst`.
    fn blit(&mut self, src: &[f32], dst: &mut [f32]);

    /// Queue an asynchronous device-to-host transfer.
    ///
    /// Returns `Err` only when the request could not be queued at all;
    /// transfer failures arrive later as a failed completion.
    fn request_readback(&mut self, request: ReadbackRequest) -> Result<(), BackendError>;

    /// Advance the backend by one frame, delivering any readbacks that
    /// have become ready.
    fn poll(&mut self);

    /// Deliver every outstanding readback now. Used by shutdown drains.
    fn flush(&mut self);

    /// Number of readbacks queued but not yet delivered.
    fn pending_readbacks(&self) -> usize;
}
