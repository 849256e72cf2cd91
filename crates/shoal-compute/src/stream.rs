//! [`CommandStream`]: a backend paired with the resolved core kernels.

use crate::backend::ComputeBackend;
use crate::kernel::{KernelId, Kernels};

/// Workgroup edge length assumed when sizing 2D dispatches.
pub const WORKGROUP_SIZE: u32 = 8;

/// Workgroup counts covering a `width × height` grid.
pub fn workgroups(width: u32, height: u32) -> [u32; 3] {
    [
        width.div_ceil(WORKGROUP_SIZE).max(1),
        height.div_ceil(WORKGROUP_SIZE).max(1),
        1,
    ]
}

/// The ordered command stream for one tile step.
///
/// Borrowing the backend mutably for the lifetime of the stream is what
/// serialises a step's commands: nothing else can issue work while a
/// stream is alive.
pub struct CommandStream<'a> {
    backend: &'a mut dyn ComputeBackend,
    kernels: &'a Kernels,
    dispatches: u32,
}

impl<'a> CommandStream<'a> {
    /// Open a stream on `backend`.
    pub fn new(backend: &'a mut dyn ComputeBackend, kernels: &'a Kernels) -> Self {
        Self {
            backend,
            kernels,
            dispatches: 0,
        }
    }

    /// Core kernel ids.
    pub fn kernels(&self) -> &Kernels {
        self.kernels
    }

    /// The underlying backend.
    pub fn backend(&mut self) -> &mut dyn ComputeBackend {
        &mut *self.backend
    }

    /// Dispatches issued through this stream.
    pub fn dispatches(&self) -> u32 {
        self.dispatches
    }

    /// Issue a dispatch whose host-visible effect is `work`.
    pub fn dispatch(&mut self, kernel: KernelId, groups: [u32; 3], work: impl FnOnce()) {
        self.dispatches += 1;
        let mut work = Some(work);
        self.backend.dispatch(kernel, groups, &mut || {
            if let Some(w) = work.take() {
                w();
            }
        });
    }

    /// Issue a buffer copy.
    pub fn blit(&mut self, src: &[f32], dst: &mut [f32]) {
        self.backend.blit(src, dst);
    }
}
