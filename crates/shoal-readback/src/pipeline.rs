//! One field's time-sliced readback: request, completion, mirror.

use crossbeam_channel::{Receiver, Sender};
use shoal_compute::{ComputeBackend, ReadbackCompletion, ReadbackField, ReadbackRequest};
use shoal_core::{ReadbackGeneration, TileId};

use crate::mirror::{HostMirror, MirrorElement};
use crate::slice::ReadbackSlice;

/// Cumulative counters for one pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Requests accepted by the backend.
    pub requested: u64,
    /// Completions copied into the mirror.
    pub completed: u64,
    /// Failed transfers (retried on the next slot).
    pub failed: u64,
    /// Completions ignored because their generation was superseded.
    pub stale: u64,
}

/// Time-sliced mirror of one device field.
///
/// Each pipeline owns its completion channel; a completion is matched
/// to the pipeline by the channel it arrives on and to the current
/// buffer layout by its generation.
pub struct MirrorPipeline<T: MirrorElement> {
    tile: TileId,
    slice: ReadbackSlice,
    mirror: HostMirror<T>,
    generation: ReadbackGeneration,
    reply_tx: Sender<ReadbackCompletion>,
    reply_rx: Receiver<ReadbackCompletion>,
    stats: PipelineStats,
}

impl<T: MirrorElement> MirrorPipeline<T> {
    /// A pipeline mirroring a `width × height` field in `slices` bands.
    pub fn new(tile: TileId, width: u32, height: u32, slices: u32) -> Self {
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded();
        Self {
            tile,
            slice: ReadbackSlice::new(slices),
            mirror: HostMirror::new(width, height),
            generation: ReadbackGeneration::default(),
            reply_tx,
            reply_rx,
            stats: PipelineStats::default(),
        }
    }

    /// Which field this pipeline mirrors.
    pub fn field(&self) -> ReadbackField {
        T::FIELD
    }

    /// The host mirror.
    pub fn mirror(&self) -> &HostMirror<T> {
        &self.mirror
    }

    /// The band state machine.
    pub fn slice(&self) -> &ReadbackSlice {
        &self.slice
    }

    /// Current generation.
    pub fn generation(&self) -> ReadbackGeneration {
        self.generation
    }

    /// Cumulative counters.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Whether a request is in flight.
    pub fn is_pending(&self) -> bool {
        self.slice.processing()
    }

    /// Issue a transfer of the current band of `source`, unless one is
    /// already in flight. `source` is the full row-major field.
    ///
    /// On a backend without asynchronous readback the transfer is
    /// flushed and copied into the mirror before this returns.
    ///
    /// Returns whether a request was issued. A request the backend
    /// refuses is treated like a failed transfer.
    pub fn request(&mut self, source: &[T], backend: &mut dyn ComputeBackend) -> bool {
        let expected = self.mirror.width() as usize * self.mirror.height() as usize;
        if source.len() != expected {
            log::debug!(
                "{} {:?} readback skipped: source has {} elements, mirror expects {expected}",
                self.tile,
                T::FIELD,
                source.len()
            );
            return false;
        }
        if self.slice.begin().is_none() {
            return false;
        }
        let rows = self.slice.rows(self.mirror.height());
        let width = self.mirror.width() as usize;
        let band = source[rows.start as usize * width..rows.end as usize * width].to_vec();
        let request = ReadbackRequest {
            tile: self.tile,
            field: T::FIELD,
            generation: self.generation,
            rows,
            payload: T::into_payload(band),
            reply: self.reply_tx.clone(),
        };
        match backend.request_readback(request) {
            Ok(()) => {
                self.stats.requested += 1;
                if !backend.capabilities().async_readback {
                    backend.flush();
                    self.receive();
                }
                true
            }
            Err(e) => {
                log::debug!("{} {:?} readback not queued: {e}", self.tile, T::FIELD);
                self.slice.fail();
                self.stats.failed += 1;
                false
            }
        }
    }

    /// Process every completion that has arrived. Never blocks.
    /// Returns how many completions were copied into the mirror.
    pub fn receive(&mut self) -> usize {
        let mut copied = 0;
        while let Ok(done) = self.reply_rx.try_recv() {
            if self.on_complete(done) {
                copied += 1;
            }
        }
        copied
    }

    fn on_complete(&mut self, done: ReadbackCompletion) -> bool {
        if done.generation != self.generation {
            log::debug!(
                "{} {:?} readback from {} ignored (current {})",
                self.tile,
                T::FIELD,
                done.generation,
                self.generation
            );
            self.stats.stale += 1;
            return false;
        }
        let written = match done.result {
            Ok(payload) => match T::from_payload(payload) {
                Some(values) => self.mirror.write_rows(done.rows.clone(), &values),
                None => false,
            },
            Err(e) => {
                log::debug!(
                    "{} {:?} readback of rows {:?} failed, retrying: {e}",
                    self.tile,
                    T::FIELD,
                    done.rows
                );
                false
            }
        };
        if written {
            self.slice.complete();
            self.stats.completed += 1;
        } else {
            self.slice.fail();
            self.stats.failed += 1;
        }
        written
    }

    /// Abandon the in-flight request and resize the mirror. Completions
    /// issued before this call are ignored when they arrive.
    pub fn invalidate(&mut self, width: u32, height: u32, slices: u32) {
        self.generation = self.generation.next();
        self.slice.reset(slices);
        self.mirror.reset(width, height);
    }

    /// Wait for the in-flight request to settle.
    ///
    /// Flushes the backend, which delivers every queued readback, then
    /// processes the completions. Returns whether nothing is left in
    /// flight.
    pub fn drain(&mut self, backend: &mut dyn ComputeBackend) -> bool {
        backend.flush();
        self.receive();
        !self.slice.processing()
    }
}
