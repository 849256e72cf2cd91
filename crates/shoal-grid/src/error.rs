//! Grid-specific error types.

use std::error::Error;
use std::fmt;
use std::io;

use shoal_compute::BackendError;

/// Errors from grid allocation and persistence.
///
/// Out-of-range configuration is clamped, not reported; the only
/// allocation-time failure is backend memory exhaustion.
#[derive(Debug)]
pub enum GridError {
    /// The backend could not allocate a grid buffer.
    Backend(BackendError),
    /// A persistence dump or restore failed.
    Persist(PersistError),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(e) => write!(f, "backend: {e}"),
            Self::Persist(e) => write!(f, "persist: {e}"),
        }
    }
}

impl Error for GridError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(e) => Some(e),
            Self::Persist(e) => Some(e),
        }
    }
}

impl From<BackendError> for GridError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

impl From<PersistError> for GridError {
    fn from(e: PersistError) -> Self {
        Self::Persist(e)
    }
}

/// Errors from the raw height-buffer dump format.
#[derive(Debug)]
pub enum PersistError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The data does not start with the expected magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the data.
        found: u8,
    },
    /// The dump was taken from a buffer with a different shape.
    ShapeMismatch {
        /// `(width, height, channels)` recorded in the dump.
        recorded: (u32, u32, u32),
        /// `(width, height, channels)` of the destination buffer.
        current: (u32, u32, u32),
    },
    /// The data ended before the recorded element count was read.
    Truncated,
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"SHLH\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::ShapeMismatch { recorded, current } => write!(
                f,
                "shape mismatch: dump is {}x{}x{}, buffer is {}x{}x{}",
                recorded.0, recorded.1, recorded.2, current.0, current.1, current.2
            ),
            Self::Truncated => write!(f, "dump truncated"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(e)
        }
    }
}
