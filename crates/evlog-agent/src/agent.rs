//! Drain agent
//!
//! An [`Agent`] is a unit of work invoked repeatedly by a runner. Each
//! [`EventLogReaderAgent::do_work`] call reads at most `frame_limit` frames
//! and hands each one to the message handler. Failures (returned errors and
//! panics alike) go to the error sink and never stop draining.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{info, trace};

use evlog_core::config::{DEFAULT_READER_FRAME_LIMIT, DEFAULT_SHUTDOWN_FLUSH_CYCLES};
use evlog_core::{ErrorSink, HandlerError, MessageHandler};

use crate::producer::EventLog;

/// A schedulable unit of work
pub trait Agent: Send {
    /// Name used for the runner thread and in logs
    fn role_name(&self) -> &str;

    /// Perform one bounded unit of work, returning how much was done
    ///
    /// Zero tells the runner it may back off.
    fn do_work(&mut self) -> usize;

    /// Called once by the runner after the last `do_work`
    fn on_close(&mut self) {}
}

/// Drains the event log ring buffer into a message handler
pub struct EventLogReaderAgent<H, S> {
    log: Arc<EventLog>,
    handler: H,
    error_sink: S,
    frame_limit: usize,
    shutdown_flush_cycles: usize,
    frames_read: u64,
    errors_reported: u64,
}

impl<H, S> EventLogReaderAgent<H, S>
where
    H: MessageHandler,
    S: ErrorSink,
{
    pub fn new(log: Arc<EventLog>, handler: H, error_sink: S) -> Self {
        Self {
            log,
            handler,
            error_sink,
            frame_limit: DEFAULT_READER_FRAME_LIMIT,
            shutdown_flush_cycles: DEFAULT_SHUTDOWN_FLUSH_CYCLES,
            frames_read: 0,
            errors_reported: 0,
        }
    }

    /// Frames read per `do_work`; at least one
    pub fn with_frame_limit(mut self, frame_limit: usize) -> Self {
        self.frame_limit = frame_limit.max(1);
        self
    }

    /// Read cycles attempted by the final flush
    pub fn with_shutdown_flush_cycles(mut self, cycles: usize) -> Self {
        self.shutdown_flush_cycles = cycles;
        self
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn error_sink(&self) -> &S {
        &self.error_sink
    }

    pub fn frame_limit(&self) -> usize {
        self.frame_limit
    }

    /// Frames dispatched since creation
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Handler failures passed to the error sink since creation
    pub fn errors_reported(&self) -> u64 {
        self.errors_reported
    }

    /// Drain what is left, bounded by the configured number of cycles
    ///
    /// Returns the number of frames dispatched.
    pub fn flush(&mut self) -> usize {
        let mut total = 0;
        for _ in 0..self.shutdown_flush_cycles {
            let read = self.poll();
            if read == 0 {
                break;
            }
            total += read;
        }
        total
    }

    pub fn into_parts(self) -> (H, S) {
        (self.handler, self.error_sink)
    }

    fn poll(&mut self) -> usize {
        let Self {
            log,
            handler,
            error_sink,
            frame_limit,
            errors_reported,
            ..
        } = self;

        let read = log.ring().read(
            |type_id, payload| {
                let result = catch_unwind(AssertUnwindSafe(|| handler.on_message(type_id, payload)))
                    .unwrap_or_else(|panic| Err(HandlerError::Failed(panic_message(&*panic))));

                if let Err(error) = result {
                    *errors_reported += 1;
                    error_sink.on_error(type_id, &error);
                }
            },
            *frame_limit,
        );

        self.frames_read += read as u64;
        read
    }
}

impl<H, S> Agent for EventLogReaderAgent<H, S>
where
    H: MessageHandler,
    S: ErrorSink,
{
    fn role_name(&self) -> &str {
        "evlog-reader"
    }

    fn do_work(&mut self) -> usize {
        let read = self.poll();
        if read > 0 {
            trace!(frames = read, "Drained event frames");
        }
        read
    }

    fn on_close(&mut self) {
        let flushed = self.flush();
        info!(
            flushed,
            frames_read = self.frames_read,
            errors = self.errors_reported,
            dropped = self.log.dropped_events(),
            remaining = self.log.ring().size(),
            "Event log reader closed"
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", message)
    } else {
        "handler panicked".to_string()
    }
}
