//! Producer API
//!
//! [`EventLog`] is what call sites hold. Logging an event checks the
//! enablement filter, claims a frame, encodes the payload straight into the
//! ring buffer and commits. A full buffer, an oversized payload or a failing
//! encoder all end in the same place: the event is dropped and counted.
//! Nothing here blocks, allocates or reports an error to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

use evlog_core::archive::CMD_OUT_RESPONSE;
use evlog_core::{
    CodecError, ConnectRequest, ControlRequest, ControlResponse, EnablementFilter, EventCode,
    EventCodeRegistry, EventConfig, EventPayload, ResponseCode, SessionState, SessionStateChange,
};
use evlog_transport::RingBuffer;

use crate::error::AgentResult;

/// What happened to a single `log` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// The event code is not enabled; nothing was written
    Disabled,
    /// A frame was committed
    Logged,
    /// The event was enabled but could not be written
    Dropped,
}

impl LogOutcome {
    pub fn is_logged(self) -> bool {
        self == Self::Logged
    }
}

/// Registry, filter and ring buffer shared by every producer and the drain agent
pub struct EventLog {
    registry: Arc<EventCodeRegistry>,
    filter: EnablementFilter,
    ring: RingBuffer,
    dropped: CachePadded<AtomicU64>,
}

impl EventLog {
    pub fn new(
        registry: Arc<EventCodeRegistry>,
        filter: EnablementFilter,
        ring: RingBuffer,
    ) -> Self {
        Self {
            registry,
            filter,
            ring,
            dropped: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Build from configuration, resolving the enabled-events expression
    pub fn from_config(
        config: &EventConfig,
        registry: Arc<EventCodeRegistry>,
    ) -> AgentResult<Self> {
        config.validate()?;
        let filter = config.enablement_filter(&registry)?;
        let ring = RingBuffer::new(config.buffer_capacity, config.max_event_length)?;
        Ok(Self::new(registry, filter, ring))
    }

    pub fn registry(&self) -> &Arc<EventCodeRegistry> {
        &self.registry
    }

    pub fn filter(&self) -> &EnablementFilter {
        &self.filter
    }

    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    #[inline]
    pub fn is_enabled(&self, id: u16) -> bool {
        self.filter.is_enabled(id)
    }

    /// Events that were enabled but dropped
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Log an event whose payload is written by `encoder`
    ///
    /// `encoder` receives exactly `length` bytes. If it fails, the claimed
    /// frame is aborted (the reader skips it) and the event counts as dropped.
    #[inline]
    pub fn log<F>(&self, id: u16, length: usize, encoder: F) -> LogOutcome
    where
        F: FnOnce(&mut [u8]) -> Result<(), CodecError>,
    {
        if !self.filter.is_enabled(id) {
            return LogOutcome::Disabled;
        }

        let mut handle = match self.ring.try_claim(i32::from(id), length) {
            Ok(Some(handle)) => handle,
            Ok(None) | Err(_) => return self.record_drop(),
        };

        match encoder(handle.buffer_mut()) {
            Ok(()) => {
                handle.commit();
                LogOutcome::Logged
            }
            Err(_) => {
                handle.abort();
                self.record_drop()
            }
        }
    }

    /// Log an already encoded payload
    pub fn log_bytes(&self, id: u16, payload: &[u8]) -> LogOutcome {
        self.log(id, payload.len(), |buf| {
            buf.copy_from_slice(payload);
            Ok(())
        })
    }

    /// Log a typed payload under `code`
    pub fn log_payload<'a, P>(&self, code: EventCode, payload: &P) -> LogOutcome
    where
        P: EventPayload<'a>,
    {
        if !self.filter.is_enabled(code.id) {
            return LogOutcome::Disabled;
        }
        self.log(code.id, payload.encoded_length(), |buf| {
            payload.encode(buf).map(|_| ())
        })
    }

    /// Typed helpers for the archive event catalogue
    pub fn archive(&self) -> ArchiveEventLogger<'_> {
        ArchiveEventLogger { log: self }
    }

    fn record_drop(&self) -> LogOutcome {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        LogOutcome::Dropped
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("codes", &self.registry.len())
            .field("enabled", &self.filter.enabled_count())
            .field("ring", &self.ring)
            .field("dropped", &self.dropped_events())
            .finish()
    }
}

/// Call-site helpers for archive control-session events
#[derive(Debug, Clone, Copy)]
pub struct ArchiveEventLogger<'a> {
    log: &'a EventLog,
}

impl ArchiveEventLogger<'_> {
    /// A control request carrying only session and correlation ids
    pub fn control_request(
        &self,
        code: EventCode,
        control_session_id: i64,
        correlation_id: i64,
    ) -> LogOutcome {
        self.log.log_payload(
            code,
            &ControlRequest::new(control_session_id, correlation_id),
        )
    }

    /// A connect or authenticated connect request
    pub fn connect(
        &self,
        code: EventCode,
        correlation_id: i64,
        response_stream_id: i32,
        version: i32,
        response_channel: &str,
    ) -> LogOutcome {
        self.log.log_payload(
            code,
            &ConnectRequest {
                correlation_id,
                response_stream_id,
                version,
                response_channel,
            },
        )
    }

    /// A response sent on a control session
    pub fn control_response(
        &self,
        control_session_id: i64,
        correlation_id: i64,
        relevant_id: i64,
        code: ResponseCode,
        error_message: &str,
    ) -> LogOutcome {
        self.log.log_payload(
            CMD_OUT_RESPONSE,
            &ControlResponse {
                control_session_id,
                correlation_id,
                relevant_id,
                code,
                error_message,
            },
        )
    }

    /// A session moving between lifecycle states
    pub fn session_state_change(
        &self,
        code: EventCode,
        session_id: i64,
        from: SessionState,
        to: SessionState,
    ) -> LogOutcome {
        self.log
            .log_payload(code, &SessionStateChange::new(session_id, from, to))
    }
}

#[cfg(test)]
mod tests {
    use evlog_core::archive::{CMD_IN_CONNECT, CMD_IN_KEEP_ALIVE, CONTROL_SESSION_STATE_CHANGE};
    use evlog_core::dissect;

    use super::*;

    fn event_log(expression: &str, capacity: usize, max_length: usize) -> EventLog {
        let config = EventConfig::new(expression)
            .with_buffer_capacity(capacity)
            .with_max_event_length(max_length);
        EventLog::from_config(&config, Arc::new(EventCodeRegistry::archive().unwrap())).unwrap()
    }

    fn drain(log: &EventLog) -> Vec<(i32, Vec<u8>)> {
        let mut frames = Vec::new();
        log.ring()
            .read(|id, payload| frames.push((id, payload.to_vec())), usize::MAX);
        frames
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let log = event_log("CMD_IN_CONNECT", 1024, 256);
        assert_eq!(log.log_bytes(28, b"data"), LogOutcome::Disabled);
        assert_eq!(log.ring().producer_position(), 0);
        assert_eq!(log.dropped_events(), 0);
    }

    #[test]
    fn test_log_bytes_round_trip() {
        let log = event_log("all", 1024, 256);
        assert_eq!(log.log_bytes(28, b"payload"), LogOutcome::Logged);
        assert_eq!(drain(&log), vec![(28, b"payload".to_vec())]);
    }

    #[test]
    fn test_oversized_event_dropped() {
        let log = event_log("all", 1024, 16);
        assert_eq!(log.log_bytes(28, &[0; 17]), LogOutcome::Dropped);
        assert_eq!(log.dropped_events(), 1);
        assert!(log.ring().is_empty());
    }

    #[test]
    fn test_encoder_failure_does_not_stall_reader() {
        let log = event_log("all", 1024, 256);
        let outcome = log.log(28, 8, |_| {
            Err(CodecError::BufferTooSmall {
                needed: 9,
                available: 8,
            })
        });
        assert_eq!(outcome, LogOutcome::Dropped);
        assert_eq!(log.dropped_events(), 1);

        assert!(log.log_bytes(28, b"after").is_logged());
        assert_eq!(drain(&log), vec![(28, b"after".to_vec())]);
    }

    #[test]
    fn test_full_buffer_drops() {
        let log = event_log("all", 32, 8);
        let outcomes: Vec<_> = (0..5).map(|_| log.log_bytes(28, &[7; 8])).collect();
        assert_eq!(
            outcomes.iter().filter(|o| **o == LogOutcome::Logged).count(),
            2
        );
        assert_eq!(log.dropped_events(), 3);
    }

    #[test]
    fn test_archive_helpers() {
        let log = event_log("control-session,lifecycle", 4096, 512);
        let archive = log.archive();

        assert!(archive.connect(CMD_IN_CONNECT, 1, 2, 3, "aeron:ipc").is_logged());
        assert!(archive.control_request(CMD_IN_KEEP_ALIVE, 5, 6).is_logged());
        assert!(archive.control_response(5, 6, 0, ResponseCode::Ok, "").is_logged());
        assert!(
            archive
                .session_state_change(
                    CONTROL_SESSION_STATE_CHANGE,
                    5,
                    SessionState::Init,
                    SessionState::Connected,
                )
                .is_logged()
        );

        let registry = log.registry().clone();
        let lines: Vec<String> = drain(&log)
            .into_iter()
            .map(|(id, payload)| {
                let code = registry.get_by_type_id(id).unwrap();
                dissect(&code, &payload).unwrap()
            })
            .collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("CMD_IN_CONNECT: "));
        assert!(lines[0].contains("aeron:ipc"));
        assert_eq!(
            lines[1],
            "CMD_IN_KEEP_ALIVE: controlSessionId=5 correlationId=6"
        );
        assert!(lines[2].starts_with("CMD_OUT_RESPONSE: "));
        assert!(lines[3].starts_with("CONTROL_SESSION_STATE_CHANGE: sessionId=5"));
    }

    #[test]
    fn test_invalid_expression_fails_startup() {
        let config = EventConfig::new("CMD_IN_CONNECT,,CMD_IN_KEEP_ALIVE");
        let registry = Arc::new(EventCodeRegistry::archive().unwrap());
        let result = EventLog::from_config(&config, registry);
        assert!(matches!(result, Err(crate::AgentError::Config(_))));
    }
}
