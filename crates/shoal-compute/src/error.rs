//! Backend error types.

use std::error::Error;
use std::fmt;

/// Errors reported by a [`ComputeBackend`](crate::ComputeBackend).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// Device memory budget exhausted at allocation time.
    ///
    /// This is the one condition the core surfaces to callers instead of
    /// degrading around it.
    OutOfMemory {
        /// Label of the buffer that failed to allocate.
        label: String,
        /// Bytes requested.
        requested: usize,
        /// Bytes still available in the budget.
        available: usize,
    },
    /// An asynchronous transfer failed. The caller retries on its next
    /// scheduled slot.
    TransferFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The backend cannot accept work (device lost or torn down).
    Disconnected,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                label,
                requested,
                available,
            } => write!(
                f,
                "out of device memory allocating '{label}': requested {requested} bytes, \
                 {available} bytes available"
            ),
            Self::TransferFailed { reason } => write!(f, "transfer failed: {reason}"),
            Self::Disconnected => write!(f, "backend disconnected"),
        }
    }
}

impl Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_names_the_buffer() {
        let e = BackendError::OutOfMemory {
            label: "height.a".into(),
            requested: 64,
            available: 8,
        };
        let msg = e.to_string();
        assert!(msg.contains("height.a"));
        assert!(msg.contains("64"));
    }
}
