//! Transport error types

use thiserror::Error;

/// Errors raised by the ring buffer
///
/// Running out of space is not an error: [`RingBuffer::try_claim`] reports it
/// as `Ok(None)`. These variants are misuse or misconfiguration.
///
/// [`RingBuffer::try_claim`]: crate::RingBuffer::try_claim
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingBufferError {
    #[error("Capacity must be a power of two of at least {min} bytes, got {capacity}")]
    InvalidCapacity { capacity: usize, min: usize },

    #[error("Max payload length {max_payload_length} does not fit capacity {capacity}")]
    InvalidMaxPayloadLength {
        max_payload_length: usize,
        capacity: usize,
    },

    #[error("Message type id must be positive, got {0}")]
    InvalidMessageType(i32),

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RingBufferError::MessageTooLarge { size: 9000, max: 4096 };
        let msg = err.to_string();
        assert!(msg.contains("9000"));
        assert!(msg.contains("4096"));

        assert!(RingBufferError::InvalidMessageType(-1).to_string().contains("-1"));
    }
}
