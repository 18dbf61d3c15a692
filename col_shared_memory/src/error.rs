//! Error types for shared memory operations

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during shared memory operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment did not appear within the acquisition timeout
    #[error("Segment not found: {name}")]
    NotFound {
        /// Segment name or path
        name: String,
    },

    /// A polling wait exceeded its deadline
    #[error("Timed out waiting for {operation} after {elapsed:?} ({attempts} attempts)")]
    Timeout {
        /// Operation that was waiting
        operation: &'static str,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of publish or readiness attempts made
        attempts: u32,
    },

    /// Access outside the mapped segment
    #[error("Access out of bounds: {len} bytes at offset {offset} exceeds segment size {size}")]
    OutOfBounds {
        /// Requested offset
        offset: usize,
        /// Requested length
        len: usize,
        /// Segment size
        size: usize,
    },

    /// A camera block violates the wire format
    #[error("Invalid frame in camera block {block}: {reason}")]
    InvalidFrame {
        /// Camera block index
        block: usize,
        /// What was wrong
        reason: String,
    },

    /// Mapped object is smaller than the layout requires
    #[error("Invalid segment size: {size} bytes (expected at least {expected})")]
    InvalidSize {
        /// Actual size in bytes
        size: usize,
        /// Size required by the layout
        expected: usize,
    },

    /// Atomic word access at a misaligned offset
    #[error("Memory alignment error: offset {offset:#x} not aligned to {alignment}")]
    AlignmentError {
        /// Segment offset
        offset: usize,
        /// Required alignment
        alignment: usize,
    },

    /// The platform cannot share a named segment with the simulator
    #[error("{operation} is not supported on this platform (segment {name})")]
    Unsupported {
        /// Operation that was attempted
        operation: &'static str,
        /// Segment name
        name: String,
    },

    /// The configuration handshake already completed for this session
    #[error("Configuration already acknowledged for this session")]
    AlreadyConfigured,

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

impl ShmError {
    /// Whether the caller may retry the operation (on a later tick or a
    /// fresh handshake).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::InvalidFrame { .. })
    }
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let timeout = ShmError::Timeout {
            operation: "ack",
            elapsed: Duration::from_secs(1),
            attempts: 10,
        };
        assert!(timeout.is_retryable());
        assert!(
            ShmError::InvalidFrame {
                block: 0,
                reason: "x".into()
            }
            .is_retryable()
        );
        assert!(
            !ShmError::OutOfBounds {
                offset: 0,
                len: 1,
                size: 0
            }
            .is_retryable()
        );
        assert!(!ShmError::NotFound { name: "x".into() }.is_retryable());

        let unsupported = ShmError::Unsupported {
            operation: "named segment acquisition",
            name: "paris3d_ipc".into(),
        };
        assert!(!unsupported.is_retryable());
        assert_eq!(
            unsupported.to_string(),
            "named segment acquisition is not supported on this platform (segment paris3d_ipc)"
        );
    }
}
