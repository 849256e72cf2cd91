//! Host-side copies of device fields.

use std::ops::Range;

use shoal_compute::{ReadbackField, ReadbackPayload};
use shoal_core::PackedCell;

/// An element type that can be moved through a readback payload.
pub trait MirrorElement: Copy + Default + Send + 'static {
    /// The field this element type is mirrored for.
    const FIELD: ReadbackField;

    /// Wrap rows into a payload.
    fn into_payload(rows: Vec<Self>) -> ReadbackPayload;

    /// Unwrap a payload. `None` if it carries another element type.
    fn from_payload(payload: ReadbackPayload) -> Option<Vec<Self>>;
}

impl MirrorElement for PackedCell {
    const FIELD: ReadbackField = ReadbackField::Surface;

    fn into_payload(rows: Vec<Self>) -> ReadbackPayload {
        ReadbackPayload::Cells(rows)
    }

    fn from_payload(payload: ReadbackPayload) -> Option<Vec<Self>> {
        match payload {
            ReadbackPayload::Cells(v) => Some(v),
            ReadbackPayload::Seeds(_) => None,
        }
    }
}

impl MirrorElement for [f32; 2] {
    const FIELD: ReadbackField = ReadbackField::Distance;

    fn into_payload(rows: Vec<Self>) -> ReadbackPayload {
        ReadbackPayload::Seeds(rows)
    }

    fn from_payload(payload: ReadbackPayload) -> Option<Vec<Self>> {
        match payload {
            ReadbackPayload::Seeds(v) => Some(v),
            ReadbackPayload::Cells(_) => None,
        }
    }
}

/// Persistent host copy of a `width × height` field.
///
/// Rows become readable once a completion has written them. Different
/// rows may have been copied on different frames.
#[derive(Clone, Debug)]
pub struct HostMirror<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
    filled: Vec<bool>,
}

impl<T: Copy + Default> HostMirror<T> {
    /// An empty mirror; no row is readable yet.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width as usize * height as usize],
            filled: vec![false; height as usize],
        }
    }

    /// Width in elements.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Copy `values` into `rows`. Returns `false`, leaving the mirror
    /// untouched, if the rows or length do not fit.
    pub fn write_rows(&mut self, rows: Range<u32>, values: &[T]) -> bool {
        if rows.start > rows.end || rows.end > self.height {
            return false;
        }
        let start = rows.start as usize * self.width as usize;
        let end = rows.end as usize * self.width as usize;
        if values.len() != end - start {
            return false;
        }
        self.data[start..end].copy_from_slice(values);
        for f in &mut self.filled[rows.start as usize..rows.end as usize] {
            *f = true;
        }
        true
    }

    /// Element at `(x, y)`, or `None` if out of range or not yet copied.
    pub fn get(&self, x: u32, y: u32) -> Option<T> {
        if x >= self.width || y >= self.height || !self.filled[y as usize] {
            return None;
        }
        Some(self.data[y as usize * self.width as usize + x as usize])
    }

    /// Whether row `y` has been copied at least once.
    pub fn row_ready(&self, y: u32) -> bool {
        self.filled.get(y as usize).copied().unwrap_or(false)
    }

    /// Whether every row has been copied at least once.
    pub fn is_complete(&self) -> bool {
        self.filled.iter().all(|f| *f)
    }

    /// Raw row-major data, including rows not yet copied.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Drop all data and resize.
    pub fn reset(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }
}
