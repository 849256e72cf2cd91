//! Host-visible storage for one device buffer.

use shoal_compute::{BackendError, BufferDesc, BufferHandle, ComputeBackend};
use shoal_core::PackedCell;

/// A `width × height × channels` buffer of `T`, row-major, channels
/// interleaved.
///
/// The buffer owns a device allocation (`handle`) and the host-visible
/// contents the software path operates on. Dropping a `GridBuffer`
/// does not return its allocation; call [`release`](Self::release).
#[derive(Clone, Debug, PartialEq)]
pub struct GridBuffer<T> {
    label: String,
    handle: Option<BufferHandle>,
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<T>,
}

/// Scalar or vector `f32` field (height, velocity, terrain, ...).
pub type FieldBuffer = GridBuffer<f32>;

/// Composite render field of packed cells.
pub type PackedField = GridBuffer<PackedCell>;

/// Jump-flood seed field: nearest-fluid UV per cell, `[NaN, NaN]` when
/// no seed has been found.
pub type SeedField = GridBuffer<[f32; 2]>;

impl<T: Copy + Default> GridBuffer<T> {
    /// Allocate a zero-filled buffer on `backend`.
    pub fn allocate(
        backend: &mut dyn ComputeBackend,
        label: impl Into<String>,
        width: u32,
        height: u32,
        channels: u32,
    ) -> Result<Self, BackendError> {
        let mut buffer = Self::detached(label, width, height, channels);
        let desc = BufferDesc::of::<T>(buffer.label.clone(), buffer.data.len());
        buffer.handle = Some(backend.allocate(&desc)?);
        Ok(buffer)
    }

    /// A host-only buffer with no device allocation.
    pub fn detached(label: impl Into<String>, width: u32, height: u32, channels: u32) -> Self {
        let channels = channels.max(1);
        let len = width as usize * height as usize * channels as usize;
        Self {
            label: label.into(),
            handle: None,
            width,
            height,
            channels,
            data: vec![T::default(); len],
        }
    }

    /// Return the device allocation. The host contents are kept.
    pub fn release(&mut self, backend: &mut dyn ComputeBackend) {
        if let Some(handle) = self.handle.take() {
            backend.release(handle);
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Device allocation, if any.
    pub fn handle(&self) -> Option<BufferHandle> {
        self.handle
    }

    /// Width in cells.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Values per cell.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// `(width, height, channels)`.
    pub fn shape(&self) -> (u32, u32, u32) {
        (self.width, self.height, self.channels)
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether `(x, y)` lies inside the buffer.
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    /// Flat index of the first channel of cell `(x, y)`.
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }

    /// One channel of one cell.
    pub fn get(&self, x: u32, y: u32, channel: u32) -> T {
        self.data[self.index(x, y) + channel as usize]
    }

    /// Write one channel of one cell.
    pub fn set(&mut self, x: u32, y: u32, channel: u32, value: T) {
        let i = self.index(x, y) + channel as usize;
        self.data[i] = value;
    }

    /// All channels of one cell.
    pub fn cell(&self, x: u32, y: u32) -> &[T] {
        let i = self.index(x, y);
        &self.data[i..i + self.channels as usize]
    }

    /// Mutable channels of one cell.
    pub fn cell_mut(&mut self, x: u32, y: u32) -> &mut [T] {
        let i = self.index(x, y);
        let c = self.channels as usize;
        &mut self.data[i..i + c]
    }

    /// One full row (all channels).
    pub fn row(&self, y: u32) -> &[T] {
        let stride = self.width as usize * self.channels as usize;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Rows `start..end` as a contiguous slice.
    pub fn rows(&self, start: u32, end: u32) -> &[T] {
        let stride = self.width as usize * self.channels as usize;
        let end = end.min(self.height);
        let start = start.min(end);
        &self.data[start as usize * stride..end as usize * stride]
    }

    /// Set every value to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Raw contents.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable raw contents.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}
