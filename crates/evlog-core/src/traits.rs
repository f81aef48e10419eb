//! Dispatch contracts
//!
//! The drain side of the transport is polymorphic over these traits. A
//! handler decides what happens to a decoded frame (logging, test
//! assertions, metrics); an error sink receives the failures a handler
//! reports, so one bad frame never stops draining.

use crate::error::HandlerError;

/// Receives every frame read from the transport
///
/// `type_id` is the event code id from the frame header and `payload` is the
/// raw payload, valid only for the duration of the call.
pub trait MessageHandler: Send {
    fn on_message(&mut self, type_id: i32, payload: &[u8]) -> Result<(), HandlerError>;
}

impl<H: MessageHandler + ?Sized> MessageHandler for Box<H> {
    fn on_message(&mut self, type_id: i32, payload: &[u8]) -> Result<(), HandlerError> {
        (**self).on_message(type_id, payload)
    }
}

/// Adapts a closure into a [`MessageHandler`]
pub struct FnHandler<F>(F);

/// Wrap a closure as a [`MessageHandler`]
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(i32, &[u8]) -> Result<(), HandlerError> + Send,
{
    FnHandler(f)
}

impl<F> MessageHandler for FnHandler<F>
where
    F: FnMut(i32, &[u8]) -> Result<(), HandlerError> + Send,
{
    fn on_message(&mut self, type_id: i32, payload: &[u8]) -> Result<(), HandlerError> {
        (self.0)(type_id, payload)
    }
}

/// Fallback path for handler and decode failures
pub trait ErrorSink: Send {
    fn on_error(&mut self, type_id: i32, error: &HandlerError);
}

impl<S: ErrorSink + ?Sized> ErrorSink for Box<S> {
    fn on_error(&mut self, type_id: i32, error: &HandlerError) {
        (**self).on_error(type_id, error)
    }
}

/// Handler that discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl MessageHandler for NullHandler {
    fn on_message(&mut self, _type_id: i32, _payload: &[u8]) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Error sink that collects errors in memory
#[derive(Debug, Clone, Default)]
pub struct CollectingErrorSink {
    pub errors: Vec<(i32, HandlerError)>,
}

impl ErrorSink for CollectingErrorSink {
    fn on_error(&mut self, type_id: i32, error: &HandlerError) {
        self.errors.push((type_id, error.clone()));
    }
}
