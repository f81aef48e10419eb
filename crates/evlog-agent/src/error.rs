//! Error types for the event log agent

use thiserror::Error;

use evlog_core::{ConfigError, RegistryError};
use evlog_transport::RingBufferError;

/// Errors raised while building or starting the event log
///
/// All of these surface at startup. Once the agent is running, nothing on
/// the producer or drain path returns an error to its caller.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Malformed configuration or enabled-events expression
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid event code catalogue
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Ring buffer layout rejected
    #[error("Ring buffer error: {0}")]
    RingBuffer(#[from] RingBufferError),

    /// A process-wide event log is already installed
    #[error("Event log already initialized")]
    AlreadyInitialized,

    /// The drain thread could not be started
    #[error("Failed to spawn agent thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: AgentError = ConfigError::UnknownReader("x".to_string()).into();
        assert!(matches!(err, AgentError::Config(_)));

        let err: AgentError = RingBufferError::InvalidMessageType(0).into();
        assert!(err.to_string().starts_with("Ring buffer error"));

        assert_eq!(
            AgentError::AlreadyInitialized.to_string(),
            "Event log already initialized"
        );
    }
}
