//! Process-wide event log
//!
//! Initialised explicitly, once, before producers start; cleared with
//! [`reset`] so tests can start from a clean slate. Call sites that log
//! often should keep the `Arc` from [`current`] rather than going through
//! the lock on every event.

use std::sync::Arc;

use parking_lot::RwLock;

use evlog_core::CodecError;

use crate::error::{AgentError, AgentResult};
use crate::producer::{EventLog, LogOutcome};

static EVENT_LOG: RwLock<Option<Arc<EventLog>>> = RwLock::new(None);

/// Install the process-wide event log
pub fn init(log: Arc<EventLog>) -> AgentResult<()> {
    let mut slot = EVENT_LOG.write();
    if slot.is_some() {
        return Err(AgentError::AlreadyInitialized);
    }
    *slot = Some(log);
    Ok(())
}

pub fn current() -> Option<Arc<EventLog>> {
    EVENT_LOG.read().clone()
}

pub fn is_initialized() -> bool {
    EVENT_LOG.read().is_some()
}

/// Log through the process-wide event log; `Disabled` when none is installed
///
/// The slot lock is released before the event is written.
pub fn log<F>(id: u16, length: usize, encoder: F) -> LogOutcome
where
    F: FnOnce(&mut [u8]) -> Result<(), CodecError>,
{
    match current() {
        Some(log) => log.log(id, length, encoder),
        None => LogOutcome::Disabled,
    }
}

/// Log an already encoded payload through the process-wide event log
pub fn log_bytes(id: u16, payload: &[u8]) -> LogOutcome {
    match current() {
        Some(log) => log.log_bytes(id, payload),
        None => LogOutcome::Disabled,
    }
}

/// Remove the process-wide event log, returning it
pub fn reset() -> Option<Arc<EventLog>> {
    EVENT_LOG.write().take()
}

/// Remove the process-wide event log only if it is `log`
pub(crate) fn reset_if(log: &Arc<EventLog>) -> bool {
    let mut slot = EVENT_LOG.write();
    if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, log)) {
        *slot = None;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use evlog_core::{EventCodeRegistry, EventConfig};

    use super::*;

    fn event_log() -> Arc<EventLog> {
        let config = EventConfig::new("CMD_IN_KEEP_ALIVE")
            .with_buffer_capacity(1024)
            .with_max_event_length(64);
        Arc::new(
            EventLog::from_config(&config, Arc::new(EventCodeRegistry::archive().unwrap()))
                .unwrap(),
        )
    }

    // The only test in this crate's unit tests that touches the global slot
    #[test]
    fn test_global_lifecycle() {
        reset();
        assert!(!is_initialized());
        assert_eq!(log_bytes(28, b"x"), LogOutcome::Disabled);

        let log = event_log();
        init(Arc::clone(&log)).unwrap();
        assert!(matches!(init(event_log()), Err(AgentError::AlreadyInitialized)));

        assert_eq!(log_bytes(28, b"x"), LogOutcome::Logged);
        assert_eq!(log_bytes(1, b"x"), LogOutcome::Disabled);
        assert_eq!(log.ring().read(|_, _| {}, 10), 1);

        assert!(!reset_if(&event_log()));
        assert!(reset_if(&log));
        assert!(current().is_none());
        assert!(reset().is_none());

        // Teardown from inside an encoder must not wait on the slot lock
        init(Arc::clone(&log)).unwrap();
        let outcome = super::log(28, 1, |buf| {
            assert!(reset().is_some());
            buf[0] = 9;
            Ok(())
        });
        assert_eq!(outcome, LogOutcome::Logged);
        assert!(!is_initialized());
        assert_eq!(log.ring().read(|_, payload| assert_eq!(payload, [9]), 10), 1);
    }
}
