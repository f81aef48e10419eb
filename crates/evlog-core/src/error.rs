//! Error types for evlog

use thiserror::Error;

/// Top-level error type for evlog
#[derive(Debug, Error)]
pub enum EvlogError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),
}

/// Errors raised while building the event code registry
///
/// These are startup errors; a registry that fails to build must not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Duplicate event code id {id} ({existing} and {duplicate})")]
    DuplicateId {
        id: u16,
        existing: &'static str,
        duplicate: &'static str,
    },

    #[error("Duplicate event code name: {0}")]
    DuplicateName(&'static str),

    #[error("Event code id 0 is reserved ({0})")]
    ReservedId(&'static str),

    #[error("Event code ids are not dense: id {missing} is missing")]
    NotDense { missing: u16 },

    #[error("Unknown event code id: {0}")]
    UnknownId(u16),
}

/// Errors raised while loading event logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Empty token at position {position} in enabled events '{expression}'")]
    EmptyToken { expression: String, position: usize },

    #[error("Unknown event code name: {0}")]
    UnknownEventName(String),

    #[error("Unknown event code id: {0}")]
    UnknownEventId(String),

    #[error("Unknown reader kind: {0}")]
    UnknownReader(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Errors raised while encoding or decoding event payloads
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Payload too short: need {needed} bytes, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Destination too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("Invalid UTF-8 in field {0}")]
    InvalidUtf8(&'static str),

    #[error("Invalid value {value} for field {field}")]
    InvalidValue { field: &'static str, value: i64 },

    #[error("Trailing bytes after payload: {0}")]
    TrailingBytes(usize),
}

/// Errors returned by a message handler for a single frame
///
/// A handler error never stops draining; the frame is consumed and the error
/// is reported to an [`ErrorSink`](crate::traits::ErrorSink).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Decode failed: {0}")]
    Decode(#[from] CodecError),

    #[error("Unknown event code id: {0}")]
    UnknownEventCode(i32),

    #[error("Handler failed: {0}")]
    Failed(String),
}

/// Result type alias for evlog operations
pub type EvlogResult<T> = Result<T, EvlogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::DuplicateId {
            id: 27,
            existing: "CMD_IN_AUTH_CONNECT",
            duplicate: "CMD_IN_OTHER",
        };
        let msg = format!("{}", err);
        assert!(msg.contains("27"));
        assert!(msg.contains("CMD_IN_AUTH_CONNECT"));
        assert!(msg.contains("CMD_IN_OTHER"));

        let err = RegistryError::NotDense { missing: 4 };
        assert!(format!("{}", err).contains("4"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownEventName("CMD_IN_NOPE".to_string());
        assert!(format!("{}", err).contains("CMD_IN_NOPE"));

        let err = ConfigError::EmptyToken {
            expression: "a,,b".to_string(),
            position: 1,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("a,,b"));
        assert!(msg.contains("position 1"));
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::InsufficientData {
            needed: 16,
            available: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("16"));
        assert!(msg.contains("3"));
    }

    #[test]
    fn test_error_conversions() {
        let err: EvlogError = RegistryError::UnknownId(9).into();
        assert!(matches!(err, EvlogError::Registry(_)));

        let err: EvlogError = ConfigError::Invalid("x".to_string()).into();
        assert!(matches!(err, EvlogError::Config(_)));

        let handler_err: HandlerError = CodecError::TrailingBytes(2).into();
        assert!(matches!(handler_err, HandlerError::Decode(_)));

        let err: EvlogError = handler_err.into();
        assert!(format!("{}", err).contains("Handler error"));
    }
}
