//! Built-in archive control-session event catalogue

use crate::error::RegistryError;
use crate::event::{EventCategory, EventCode, PayloadKind};
use crate::registry::EventCodeRegistry;

const fn request(id: u16, name: &'static str) -> EventCode {
    EventCode::new(
        id,
        name,
        EventCategory::ControlSession,
        PayloadKind::ControlRequest,
    )
}

const fn state_change(id: u16, name: &'static str) -> EventCode {
    EventCode::new(
        id,
        name,
        EventCategory::Lifecycle,
        PayloadKind::SessionStateChange,
    )
}

pub const CMD_IN_CONNECT: EventCode = EventCode::new(
    1,
    "CMD_IN_CONNECT",
    EventCategory::ControlSession,
    PayloadKind::ConnectRequest,
);
pub const CMD_IN_CLOSE_SESSION: EventCode = request(2, "CMD_IN_CLOSE_SESSION");
pub const CMD_IN_START_RECORDING: EventCode = request(3, "CMD_IN_START_RECORDING");
pub const CMD_IN_STOP_RECORDING: EventCode = request(4, "CMD_IN_STOP_RECORDING");
pub const CMD_IN_REPLAY: EventCode = request(5, "CMD_IN_REPLAY");
pub const CMD_IN_STOP_REPLAY: EventCode = request(6, "CMD_IN_STOP_REPLAY");
pub const CMD_IN_LIST_RECORDINGS: EventCode = request(7, "CMD_IN_LIST_RECORDINGS");
pub const CMD_IN_LIST_RECORDINGS_FOR_URI: EventCode = request(8, "CMD_IN_LIST_RECORDINGS_FOR_URI");
pub const CMD_IN_LIST_RECORDING: EventCode = request(9, "CMD_IN_LIST_RECORDING");
pub const CMD_IN_EXTEND_RECORDING: EventCode = request(10, "CMD_IN_EXTEND_RECORDING");
pub const CMD_IN_RECORDING_POSITION: EventCode = request(11, "CMD_IN_RECORDING_POSITION");
pub const CMD_IN_TRUNCATE_RECORDING: EventCode = request(12, "CMD_IN_TRUNCATE_RECORDING");
pub const CMD_IN_STOP_RECORDING_SUBSCRIPTION: EventCode =
    request(13, "CMD_IN_STOP_RECORDING_SUBSCRIPTION");
pub const CMD_IN_STOP_POSITION: EventCode = request(14, "CMD_IN_STOP_POSITION");
pub const CMD_IN_FIND_LAST_MATCHING_RECORD: EventCode =
    request(15, "CMD_IN_FIND_LAST_MATCHING_RECORD");
pub const CMD_IN_LIST_RECORDING_SUBSCRIPTIONS: EventCode =
    request(16, "CMD_IN_LIST_RECORDING_SUBSCRIPTIONS");
pub const CMD_IN_START_BOUNDED_REPLAY: EventCode = request(17, "CMD_IN_START_BOUNDED_REPLAY");
pub const CMD_IN_STOP_ALL_REPLAYS: EventCode = request(18, "CMD_IN_STOP_ALL_REPLAYS");
pub const CMD_IN_REPLICATE: EventCode = request(19, "CMD_IN_REPLICATE");
pub const CMD_IN_STOP_REPLICATION: EventCode = request(20, "CMD_IN_STOP_REPLICATION");
pub const CMD_IN_START_POSITION: EventCode = request(21, "CMD_IN_START_POSITION");
pub const CMD_IN_DETACH_SEGMENTS: EventCode = request(22, "CMD_IN_DETACH_SEGMENTS");
pub const CMD_IN_DELETE_DETACHED_SEGMENTS: EventCode =
    request(23, "CMD_IN_DELETE_DETACHED_SEGMENTS");
pub const CMD_IN_PURGE_SEGMENTS: EventCode = request(24, "CMD_IN_PURGE_SEGMENTS");
pub const CMD_IN_ATTACH_SEGMENTS: EventCode = request(25, "CMD_IN_ATTACH_SEGMENTS");
pub const CMD_IN_MIGRATE_SEGMENTS: EventCode = request(26, "CMD_IN_MIGRATE_SEGMENTS");
pub const CMD_IN_AUTH_CONNECT: EventCode = EventCode::new(
    27,
    "CMD_IN_AUTH_CONNECT",
    EventCategory::ControlSession,
    PayloadKind::ConnectRequest,
);
pub const CMD_IN_KEEP_ALIVE: EventCode = request(28, "CMD_IN_KEEP_ALIVE");
pub const CMD_IN_TAGGED_REPLICATE: EventCode = request(29, "CMD_IN_TAGGED_REPLICATE");
pub const CMD_OUT_RESPONSE: EventCode = EventCode::new(
    30,
    "CMD_OUT_RESPONSE",
    EventCategory::ControlSession,
    PayloadKind::ControlResponse,
);
pub const CONTROL_SESSION_STATE_CHANGE: EventCode =
    state_change(31, "CONTROL_SESSION_STATE_CHANGE");
pub const REPLAY_SESSION_STATE_CHANGE: EventCode = state_change(32, "REPLAY_SESSION_STATE_CHANGE");
pub const RECORDING_SESSION_STATE_CHANGE: EventCode =
    state_change(33, "RECORDING_SESSION_STATE_CHANGE");
pub const REPLICATION_SESSION_STATE_CHANGE: EventCode =
    state_change(34, "REPLICATION_SESSION_STATE_CHANGE");

/// Every archive event code, in id order
pub const ARCHIVE_EVENT_CODES: &[EventCode] = &[
    CMD_IN_CONNECT,
    CMD_IN_CLOSE_SESSION,
    CMD_IN_START_RECORDING,
    CMD_IN_STOP_RECORDING,
    CMD_IN_REPLAY,
    CMD_IN_STOP_REPLAY,
    CMD_IN_LIST_RECORDINGS,
    CMD_IN_LIST_RECORDINGS_FOR_URI,
    CMD_IN_LIST_RECORDING,
    CMD_IN_EXTEND_RECORDING,
    CMD_IN_RECORDING_POSITION,
    CMD_IN_TRUNCATE_RECORDING,
    CMD_IN_STOP_RECORDING_SUBSCRIPTION,
    CMD_IN_STOP_POSITION,
    CMD_IN_FIND_LAST_MATCHING_RECORD,
    CMD_IN_LIST_RECORDING_SUBSCRIPTIONS,
    CMD_IN_START_BOUNDED_REPLAY,
    CMD_IN_STOP_ALL_REPLAYS,
    CMD_IN_REPLICATE,
    CMD_IN_STOP_REPLICATION,
    CMD_IN_START_POSITION,
    CMD_IN_DETACH_SEGMENTS,
    CMD_IN_DELETE_DETACHED_SEGMENTS,
    CMD_IN_PURGE_SEGMENTS,
    CMD_IN_ATTACH_SEGMENTS,
    CMD_IN_MIGRATE_SEGMENTS,
    CMD_IN_AUTH_CONNECT,
    CMD_IN_KEEP_ALIVE,
    CMD_IN_TAGGED_REPLICATE,
    CMD_OUT_RESPONSE,
    CONTROL_SESSION_STATE_CHANGE,
    REPLAY_SESSION_STATE_CHANGE,
    RECORDING_SESSION_STATE_CHANGE,
    REPLICATION_SESSION_STATE_CHANGE,
];

impl EventCodeRegistry {
    /// Registry holding the archive catalogue
    pub fn archive() -> Result<Self, RegistryError> {
        Self::from_codes(ARCHIVE_EVENT_CODES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_registry_builds() {
        let registry = EventCodeRegistry::archive().unwrap();
        assert_eq!(registry.len(), ARCHIVE_EVENT_CODES.len());
        assert_eq!(registry.min_id(), 1);
        assert_eq!(registry.by_name("CMD_IN_AUTH_CONNECT"), Some(CMD_IN_AUTH_CONNECT));
        assert_eq!(registry.decode_name(28), "CMD_IN_KEEP_ALIVE");
    }

    #[test]
    fn test_lifecycle_category() {
        let registry = EventCodeRegistry::archive().unwrap();
        let lifecycle: Vec<_> = registry.codes_in(EventCategory::Lifecycle).collect();
        assert_eq!(lifecycle.len(), 4);
        assert!(lifecycle.iter().all(|c| c.payload == PayloadKind::SessionStateChange));
    }
}
