//! Event codes and categories

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category an event code belongs to
///
/// Categories double as shorthand tokens in the enabled-events expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventCategory {
    /// Control session commands and responses
    ControlSession,
    /// Session state transitions
    Lifecycle,
}

impl EventCategory {
    /// All categories, in bit order
    pub const ALL: [EventCategory; 2] = [EventCategory::ControlSession, EventCategory::Lifecycle];

    /// Configuration token for this category
    pub const fn token(self) -> &'static str {
        match self {
            Self::ControlSession => "control-session",
            Self::Lifecycle => "lifecycle",
        }
    }

    pub(crate) const fn bit(self) -> u8 {
        match self {
            Self::ControlSession => 1 << 0,
            Self::Lifecycle => 1 << 1,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for EventCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.token().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Layout of the payload carried by an event code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    /// [`ControlRequest`](crate::codec::ControlRequest)
    ControlRequest,
    /// [`ConnectRequest`](crate::codec::ConnectRequest)
    ConnectRequest,
    /// [`ControlResponse`](crate::codec::ControlResponse)
    ControlResponse,
    /// [`SessionStateChange`](crate::codec::SessionStateChange)
    SessionStateChange,
    /// Opaque bytes, rendered as hex
    Raw,
}

/// A named kind of diagnostic event
///
/// Event codes are plain values and are never mutated once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventCode {
    /// Dense, process-wide unique id (0 is reserved)
    pub id: u16,
    /// Symbolic name, also accepted in the enabled-events expression
    pub name: &'static str,
    /// Category used for shorthand enablement
    pub category: EventCategory,
    /// Payload layout
    pub payload: PayloadKind,
}

impl EventCode {
    /// Create a new event code
    pub const fn new(
        id: u16,
        name: &'static str,
        category: EventCategory,
        payload: PayloadKind,
    ) -> Self {
        Self {
            id,
            name,
            category,
            payload,
        }
    }

    /// The id as written into a frame header
    pub const fn type_id(&self) -> i32 {
        self.id as i32
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tokens() {
        assert_eq!(EventCategory::ControlSession.token(), "control-session");
        assert_eq!(
            "LIFECYCLE".parse::<EventCategory>(),
            Ok(EventCategory::Lifecycle)
        );
        assert!("metrics".parse::<EventCategory>().is_err());
    }

    #[test]
    fn test_category_bits_distinct() {
        let mut seen = 0u8;
        for category in EventCategory::ALL {
            assert_eq!(seen & category.bit(), 0);
            seen |= category.bit();
        }
    }

    #[test]
    fn test_event_code_display() {
        let code = EventCode::new(
            28,
            "CMD_IN_KEEP_ALIVE",
            EventCategory::ControlSession,
            PayloadKind::ControlRequest,
        );
        assert_eq!(code.to_string(), "CMD_IN_KEEP_ALIVE(28)");
        assert_eq!(code.type_id(), 28);
    }
}
