//! Error types.

use thiserror::Error;

use crate::emitter::OutputProjection;
use crate::variant::SensorVariant;

/// Outcome of a decode attempt that didn't produce a frame.
///
/// None of these are fatal: the caller retries on its next poll.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The decoder has no transport.
    #[error("decoder not initialized")]
    NotInitialized,

    /// Not enough bytes buffered for a whole frame yet.
    #[error("frame not ready")]
    NotReady,

    /// The two bytes at the cursor aren't `0x42 0x4D`.
    #[error("frame signature mismatch: 0x{found:04X}")]
    FramingMismatch { found: u16 },

    /// The frame's length field disagrees with the configured variant.
    #[error("invalid frame length {declared}, expected {expected}")]
    InvalidLength { declared: u16, expected: u16 },

    /// Sum of the received bytes doesn't match the transmitted checksum.
    #[error("checksum mismatch: computed 0x{computed:04X}, transmitted 0x{transmitted:04X}")]
    ChecksumMismatch { computed: u16, transmitted: u16 },
}

impl DecodeError {
    /// True when the caller should simply wait for more bytes.
    pub fn is_retry(&self) -> bool {
        matches!(self, DecodeError::NotReady)
    }
}

/// Rejected configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown sensor model: {0}")]
    UnknownVariant(String),

    #[error("unknown output selection: {0}")]
    UnknownProjection(String),

    #[error("unknown event mode: {0}")]
    UnknownEventMode(String),

    #[error("{projection} output is not available on {variant}")]
    UnsupportedProjection {
        variant: SensorVariant,
        projection: OutputProjection,
    },

    #[error("event name prefix must not be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_ready_is_retry() {
        assert!(DecodeError::NotReady.is_retry());
        assert!(!DecodeError::NotInitialized.is_retry());
        assert!(!DecodeError::FramingMismatch { found: 0 }.is_retry());
        assert!(!DecodeError::InvalidLength { declared: 16, expected: 28 }.is_retry());
    }

    #[test]
    fn messages_carry_values() {
        let e = DecodeError::InvalidLength { declared: 16, expected: 28 };
        assert_eq!(e.to_string(), "invalid frame length 16, expected 28");
        let e = DecodeError::FramingMismatch { found: 0x424E };
        assert_eq!(e.to_string(), "frame signature mismatch: 0x424E");
    }
}
