//! Production drain handler
//!
//! Dissects each frame into a single text line and emits it as a tracing
//! record under the `evlog::event` target, so the host's subscriber decides
//! where event lines go and at what level they are kept.

use std::sync::Arc;

use evlog_core::{ErrorSink, EventCodeRegistry, HandlerError, MessageHandler, dissect};

/// Tracing target used for every dissected event
pub const EVENT_TARGET: &str = "evlog::event";

/// Formats frames as text and logs them through `tracing`
#[derive(Debug, Clone)]
pub struct TracingEventHandler {
    registry: Arc<EventCodeRegistry>,
}

impl TracingEventHandler {
    pub fn new(registry: Arc<EventCodeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EventCodeRegistry {
        &self.registry
    }
}

impl MessageHandler for TracingEventHandler {
    fn on_message(&mut self, type_id: i32, payload: &[u8]) -> Result<(), HandlerError> {
        let code = self
            .registry
            .get_by_type_id(type_id)
            .ok_or(HandlerError::UnknownEventCode(type_id))?;
        let line = dissect(&code, payload)?;

        tracing::info!(
            target: EVENT_TARGET,
            event = code.name,
            id = code.id,
            category = %code.category,
            length = payload.len(),
            "{}",
            line
        );
        Ok(())
    }
}

/// Reports dispatch failures as warnings
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn on_error(&mut self, type_id: i32, error: &HandlerError) {
        tracing::warn!(type_id, error = %error, "Event dispatch failed, frame skipped");
    }
}

#[cfg(test)]
mod tests {
    use evlog_core::archive::CMD_IN_KEEP_ALIVE;
    use evlog_core::{CodecError, ControlRequest, EventPayload};

    use super::*;

    fn handler() -> TracingEventHandler {
        TracingEventHandler::new(Arc::new(EventCodeRegistry::archive().unwrap()))
    }

    #[test]
    fn test_known_event() {
        let mut buf = [0u8; ControlRequest::ENCODED_LENGTH];
        ControlRequest::new(1, 2).encode(&mut buf).unwrap();
        assert!(handler().on_message(CMD_IN_KEEP_ALIVE.type_id(), &buf).is_ok());
    }

    #[test]
    fn test_unknown_event() {
        let err = handler().on_message(999, &[]).unwrap_err();
        assert_eq!(err, HandlerError::UnknownEventCode(999));
    }

    #[test]
    fn test_short_payload() {
        let err = handler()
            .on_message(CMD_IN_KEEP_ALIVE.type_id(), &[0; 4])
            .unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Decode(CodecError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_error_sink_does_not_panic() {
        TracingErrorSink.on_error(5, &HandlerError::Failed("boom".to_string()));
    }
}
