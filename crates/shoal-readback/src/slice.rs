//! Round-robin row-band state machine.

use std::ops::Range;

/// Largest supported slice count.
pub const MAX_SLICES: u32 = 64;

/// Which band of rows a field transfers next, and whether a transfer is
/// in flight.
///
/// Band `s` of `N` covers rows `[s*H/N, (s+1)*H/N)`. The index only
/// advances on a successful completion, so a failed band is retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadbackSlice {
    processing: bool,
    slice_index: u32,
    slice_count: u32,
}

impl ReadbackSlice {
    /// A slicer over `slice_count` bands, clamped to `1..=MAX_SLICES`.
    pub fn new(slice_count: u32) -> Self {
        Self {
            processing: false,
            slice_index: 0,
            slice_count: slice_count.clamp(1, MAX_SLICES),
        }
    }

    /// Whether a request is outstanding.
    pub fn processing(&self) -> bool {
        self.processing
    }

    /// Band the next request covers.
    pub fn slice_index(&self) -> u32 {
        self.slice_index
    }

    /// Number of bands.
    pub fn slice_count(&self) -> u32 {
        self.slice_count
    }

    /// Rows of band `index` in a field `height` rows tall.
    pub fn band(&self, index: u32, height: u32) -> Range<u32> {
        let n = u64::from(self.slice_count);
        let h = u64::from(height);
        let s = u64::from(index.min(self.slice_count));
        (s * h / n) as u32..((s + 1).min(n) * h / n) as u32
    }

    /// Rows of the current band.
    pub fn rows(&self, height: u32) -> Range<u32> {
        self.band(self.slice_index, height)
    }

    /// Mark a request as issued. Returns the band index, or `None` if a
    /// request is already outstanding.
    pub fn begin(&mut self) -> Option<u32> {
        if self.processing {
            return None;
        }
        self.processing = true;
        Some(self.slice_index)
    }

    /// The outstanding request completed: advance to the next band.
    pub fn complete(&mut self) {
        self.processing = false;
        self.slice_index = (self.slice_index + 1) % self.slice_count;
    }

    /// The outstanding request failed: clear the flag, keep the band.
    pub fn fail(&mut self) {
        self.processing = false;
    }

    /// Forget any in-flight request and restart at band 0, optionally
    /// with a new slice count.
    pub fn reset(&mut self, slice_count: u32) {
        *self = Self::new(slice_count);
    }
}
