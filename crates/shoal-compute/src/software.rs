//! CPU implementation of [`ComputeBackend`].
//!
//! Dispatches run immediately on the calling thread, so issue order is
//! execution order. Readbacks are queued and delivered by a later
//! [`poll`](ComputeBackend::poll), after a configurable number of
//! frames, which reproduces the "completes on a future frame" contract
//! of a real device. Transfer failures can be injected for tests.

use std::collections::{HashMap, VecDeque};

use crate::backend::{
    BufferDesc, BufferHandle, Capabilities, ComputeBackend, ReadbackCompletion, ReadbackRequest,
};
use crate::error::BackendError;
use crate::kernel::KernelId;

/// Default memory budget: 1 GiB.
pub const DEFAULT_BUDGET_BYTES: usize = 1 << 30;

/// Cumulative counters kept by [`SoftwareBackend`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Kernel dispatches issued.
    pub dispatches: u64,
    /// Buffer copies issued.
    pub blits: u64,
    /// Readback requests accepted.
    pub readbacks_requested: u64,
    /// Readbacks delivered successfully.
    pub readbacks_completed: u64,
    /// Readbacks delivered as failures.
    pub readbacks_failed: u64,
    /// Completions dropped because the receiver had gone away.
    pub readbacks_orphaned: u64,
}

struct PendingReadback {
    request: ReadbackRequest,
    frames_left: u32,
}

/// In-order CPU backend with deferred readback delivery.
pub struct SoftwareBackend {
    capabilities: Capabilities,
    budget_bytes: usize,
    allocated_bytes: usize,
    allocations: HashMap<BufferHandle, usize>,
    next_handle: u64,
    latency_frames: u32,
    pending: VecDeque<PendingReadback>,
    failures_to_inject: u32,
    per_kernel: HashMap<KernelId, u64>,
    stats: BackendStats,
}

impl SoftwareBackend {
    /// Create a backend with the default budget and one frame of
    /// readback latency.
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities::default(),
            budget_bytes: DEFAULT_BUDGET_BYTES,
            allocated_bytes: 0,
            allocations: HashMap::new(),
            next_handle: 1,
            latency_frames: 1,
            pending: VecDeque::new(),
            failures_to_inject: 0,
            per_kernel: HashMap::new(),
            stats: BackendStats::default(),
        }
    }

    /// Set the memory budget in bytes.
    pub fn with_budget(mut self, bytes: usize) -> Self {
        self.budget_bytes = bytes;
        self
    }

    /// Set how many `poll()` calls a readback waits before delivery.
    /// Clamped to at least 1: completions never arrive in the issuing frame.
    pub fn with_latency(mut self, frames: u32) -> Self {
        self.latency_frames = frames.max(1);
        self
    }

    /// Override the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Make the next `count` delivered readbacks fail.
    pub fn fail_next_readbacks(&mut self, count: u32) {
        self.failures_to_inject += count;
    }

    /// Bytes currently allocated.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// Live allocation count.
    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    /// Cumulative counters.
    pub fn stats(&self) -> &BackendStats {
        &self.stats
    }

    /// How many times `kernel` has been dispatched.
    pub fn dispatch_count(&self, kernel: KernelId) -> u64 {
        self.per_kernel.get(&kernel).copied().unwrap_or(0)
    }

    fn deliver(&mut self, pending: PendingReadback) {
        let PendingReadback { request, .. } = pending;
        let result = if self.failures_to_inject > 0 {
            self.failures_to_inject -= 1;
            self.stats.readbacks_failed += 1;
            Err(BackendError::TransferFailed {
                reason: "injected failure".into(),
            })
        } else {
            self.stats.readbacks_completed += 1;
            Ok(request.payload)
        };
        let completion = ReadbackCompletion {
            tile: request.tile,
            field: request.field,
            generation: request.generation,
            rows: request.rows,
            result,
        };
        if request.reply.send(completion).is_err() {
            self.stats.readbacks_orphaned += 1;
            log::debug!("readback completion dropped: receiver disconnected");
        }
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn allocate(&mut self, desc: &BufferDesc) -> Result<BufferHandle, BackendError> {
        let available = self.budget_bytes.saturating_sub(self.allocated_bytes);
        if desc.bytes > available {
            return Err(BackendError::OutOfMemory {
                label: desc.label.clone(),
                requested: desc.bytes,
                available,
            });
        }
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;
        self.allocated_bytes += desc.bytes;
        self.allocations.insert(handle, desc.bytes);
        if self.allocated_bytes > self.budget_bytes / 10 * 9 {
            log::warn!(
                "software backend above 90% of budget ({} / {} bytes)",
                self.allocated_bytes,
                self.budget_bytes
            );
        }
        Ok(handle)
    }

    fn release(&mut self, handle: BufferHandle) {
        if let Some(bytes) = self.allocations.remove(&handle) {
            self.allocated_bytes -= bytes;
        }
    }

    fn dispatch(&mut self, kernel: KernelId, _groups: [u32; 3], work: &mut dyn FnMut()) {
        self.stats.dispatches += 1;
        *self.per_kernel.entry(kernel).or_insert(0) += 1;
        work();
    }

    fn blit(&mut self, src: &[f32], dst: &mut [f32]) {
        self.stats.blits += 1;
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
    }

    fn request_readback(&mut self, request: ReadbackRequest) -> Result<(), BackendError> {
        self.stats.readbacks_requested += 1;
        self.pending.push_back(PendingReadback {
            request,
            frames_left: self.latency_frames,
        });
        Ok(())
    }

    fn poll(&mut self) {
        let mut still_pending = VecDeque::with_capacity(self.pending.len());
        while let Some(mut p) = self.pending.pop_front() {
            p.frames_left -= 1;
            if p.frames_left == 0 {
                self.deliver(p);
            } else {
                still_pending.push_back(p);
            }
        }
        self.pending = still_pending;
    }

    fn flush(&mut self) {
        while let Some(p) = self.pending.pop_front() {
            self.deliver(p);
        }
    }

    fn pending_readbacks(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ReadbackField, ReadbackPayload};
    use shoal_core::{PackedCell, ReadbackGeneration, TileId};

    fn request(
        reply: crossbeam_channel::Sender<ReadbackCompletion>,
        rows: std::ops::Range<u32>,
    ) -> ReadbackRequest {
        ReadbackRequest {
            tile: TileId(0),
            field: ReadbackField::Surface,
            generation: ReadbackGeneration(1),
            rows,
            payload: ReadbackPayload::Cells(vec![PackedCell(7); 4]),
            reply,
        }
    }

    #[test]
    fn allocation_respects_budget() {
        let mut b = SoftwareBackend::new().with_budget(100);
        let h = b.allocate(&BufferDesc::of::<f32>("a", 20)).unwrap();
        assert_eq!(b.allocated_bytes(), 80);
        let err = b.allocate(&BufferDesc::of::<f32>("b", 6)).unwrap_err();
        assert_eq!(
            err,
            BackendError::OutOfMemory {
                label: "b".into(),
                requested: 24,
                available: 20,
            }
        );
        b.release(h);
        assert_eq!(b.allocated_bytes(), 0);
        assert!(b.allocate(&BufferDesc::of::<f32>("b", 6)).is_ok());
    }

    #[test]
    fn readback_never_completes_in_issuing_frame() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut b = SoftwareBackend::new();
        b.request_readback(request(tx, 0..1)).unwrap();
        assert!(rx.try_recv().is_err());
        b.poll();
        let done = rx.try_recv().unwrap();
        assert_eq!(done.rows, 0..1);
        assert!(done.result.is_ok());
        assert_eq!(b.pending_readbacks(), 0);
    }

    #[test]
    fn latency_delays_delivery() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut b = SoftwareBackend::new().with_latency(3);
        b.request_readback(request(tx, 0..1)).unwrap();
        b.poll();
        b.poll();
        assert!(rx.try_recv().is_err());
        b.poll();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn injected_failures_are_delivered_as_errors() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut b = SoftwareBackend::new();
        b.fail_next_readbacks(1);
        b.request_readback(request(tx.clone(), 0..1)).unwrap();
        b.request_readback(request(tx, 1..2)).unwrap();
        b.flush();
        assert!(rx.recv().unwrap().result.is_err());
        assert!(rx.recv().unwrap().result.is_ok());
        assert_eq!(b.stats().readbacks_failed, 1);
        assert_eq!(b.stats().readbacks_completed, 1);
    }

    #[test]
    fn orphaned_completion_is_counted_not_fatal() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let mut b = SoftwareBackend::new();
        b.request_readback(request(tx, 0..1)).unwrap();
        b.flush();
        assert_eq!(b.stats().readbacks_orphaned, 1);
    }
}
