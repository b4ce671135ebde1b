//! Error taxonomy for the PHY engine
//!
//! Configuration problems are fatal at construction time. Frame-alignment
//! misses are not errors at all (they surface as a flag on the frame), and
//! I/O conditions from a sample source travel as [`crate::io::RxStatus`].

use thiserror::Error;

/// Errors raised by the PHY engine
#[derive(Debug, Error)]
pub enum PhyError {
    /// MODCOD name not in the supported table
    #[error("unsupported MODCOD: {0:?}")]
    UnsupportedModcod(String),

    /// Derived frame geometry is empty or inconsistent
    #[error("invalid frame geometry: {0}")]
    InvalidGeometry(String),

    /// Synchronizer or shaping configuration out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Buffer size does not match the configured geometry
    #[error("{what}: expected {expected} samples, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// File-backed source or sink failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PhyResult<T> = Result<T, PhyError>;

/// Check a buffer length against the expected geometry
#[inline]
pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> PhyResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(PhyError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_message() {
        let err = check_len("framer input", 8100, 8099).unwrap_err();
        assert_eq!(err.to_string(), "framer input: expected 8100 samples, got 8099");
    }

    #[test]
    fn test_check_len_ok() {
        assert!(check_len("x", 4, 4).is_ok());
    }
}
