//! Raw dump/restore of the active height buffer.
//!
//! Format, all integers little-endian:
//!
//! ```text
//! magic    4 bytes  b"SHLH"
//! version  u8       1
//! width    u32
//! height   u32
//! channels u32
//! values   f32 × width × height × channels
//! ```
//!
//! Values are written bit-for-bit, so a restore reproduces the buffer
//! exactly.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::PersistError;
use crate::grid::SimulationGrid;

/// Magic bytes at the start of every dump.
pub const MAGIC: [u8; 4] = *b"SHLH";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

fn read_u32_le(r: &mut dyn Read) -> Result<u32, PersistError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

impl SimulationGrid {
    /// Write the active height buffer to `w`.
    pub fn dump_height(&self, w: &mut dyn Write) -> Result<(), PersistError> {
        let buf = self.height.active();
        let (width, height, channels) = buf.shape();
        w.write_all(&MAGIC)?;
        w.write_all(&[FORMAT_VERSION])?;
        for v in [width, height, channels] {
            w.write_all(&v.to_le_bytes())?;
        }
        for v in buf.data() {
            w.write_all(&v.to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }

    /// Replace the active height buffer with a dump read from `r`.
    ///
    /// The dump must match the buffer shape. On error the buffer is left
    /// untouched.
    pub fn restore_height(&mut self, r: &mut dyn Read) -> Result<(), PersistError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(PersistError::InvalidMagic);
        }
        let mut version = [0u8; 1];
        r.read_exact(&mut version)?;
        if version[0] != FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion { found: version[0] });
        }
        let recorded = (read_u32_le(r)?, read_u32_le(r)?, read_u32_le(r)?);
        let current = self.height.active().shape();
        if recorded != current {
            return Err(PersistError::ShapeMismatch { recorded, current });
        }
        let mut bytes = vec![0u8; self.height.active().data().len() * 4];
        r.read_exact(&mut bytes)?;
        let dst = self.height.active_mut().data_mut();
        for (v, chunk) in dst.iter_mut().zip(bytes.chunks_exact(4)) {
            *v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(())
    }

    /// Dump the active height buffer to a file.
    pub fn save_height(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let mut w = BufWriter::new(File::create(path)?);
        self.dump_height(&mut w)
    }

    /// Restore the active height buffer from a file.
    pub fn load_height(&mut self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let mut r = BufReader::new(File::open(path)?);
        self.restore_height(&mut r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use shoal_compute::SoftwareBackend;

    fn grid(res: u32) -> SimulationGrid {
        let mut backend = SoftwareBackend::new();
        SimulationGrid::init(&GridConfig::new(res, 4.0), &mut backend).unwrap()
    }

    #[test]
    fn round_trip_is_exact() {
        let mut a = grid(4);
        for (i, v) in a.height.active_mut().data_mut().iter_mut().enumerate() {
            *v = i as f32 * 0.1 + 1.0 / 3.0;
        }
        let mut bytes = Vec::new();
        a.dump_height(&mut bytes).unwrap();

        let mut b = grid(4);
        b.restore_height(&mut bytes.as_slice()).unwrap();
        assert_eq!(a.height.active().data(), b.height.active().data());
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut g = grid(4);
        let err = g.restore_height(&mut &b"NOPE\x01"[..]).unwrap_err();
        assert!(matches!(err, PersistError::InvalidMagic));
        let err = g.restore_height(&mut &b"SHLH\x07"[..]).unwrap_err();
        assert!(matches!(err, PersistError::UnsupportedVersion { found: 7 }));
    }

    #[test]
    fn rejects_shape_mismatch_without_touching_buffer() {
        let a = grid(4);
        let mut bytes = Vec::new();
        a.dump_height(&mut bytes).unwrap();
        let mut b = grid(8);
        b.height.active_mut().fill(2.0);
        let err = b.restore_height(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, PersistError::ShapeMismatch { .. }));
        assert!(b.height.active().data().iter().all(|&v| v == 2.0));
    }

    #[test]
    fn truncated_dump_is_reported() {
        let a = grid(4);
        let mut bytes = Vec::new();
        a.dump_height(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        let mut b = grid(4);
        let err = b.restore_height(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, PersistError::Truncated));
    }
}
