//! Event logging configuration
//!
//! Read once at process start. The enabled-events expression is kept as a
//! string here and resolved against a registry with
//! [`EventConfig::enablement_filter`], so a malformed expression fails at
//! startup rather than silently disabling events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::EnablementFilter;
use crate::registry::EventCodeRegistry;

pub const ENABLED_EVENTS_ENV: &str = "EVLOG_ENABLED_EVENTS";
pub const READER_ENV: &str = "EVLOG_READER";
pub const BUFFER_CAPACITY_ENV: &str = "EVLOG_BUFFER_CAPACITY";
pub const MAX_EVENT_LENGTH_ENV: &str = "EVLOG_MAX_EVENT_LENGTH";
pub const READER_FRAME_LIMIT_ENV: &str = "EVLOG_READER_FRAME_LIMIT";
pub const SHUTDOWN_FLUSH_CYCLES_ENV: &str = "EVLOG_SHUTDOWN_FLUSH_CYCLES";

pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024 * 1024;
pub const DEFAULT_MAX_EVENT_LENGTH: usize = 4096;
pub const DEFAULT_READER_FRAME_LIMIT: usize = 8;
pub const DEFAULT_SHUTDOWN_FLUSH_CYCLES: usize = 64;

/// Bytes of frame header in front of every event payload
const FRAME_HEADER_LENGTH: usize = 8;

/// Which drain handler the agent installs when none is supplied in code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    /// Dissect frames into tracing records
    #[default]
    Logging,
    /// Drain and discard
    Null,
}

impl FromStr for ReaderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logging" => Ok(Self::Logging),
            "null" => Ok(Self::Null),
            _ => Err(ConfigError::UnknownReader(s.to_string())),
        }
    }
}

impl fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logging => write!(f, "logging"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Event logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Enabled-events expression (`all`, names, ids, category tokens)
    pub enabled_events: String,
    /// Drain handler installed by default
    pub reader: ReaderKind,
    /// Ring buffer capacity in bytes, a power of two
    pub buffer_capacity: usize,
    /// Largest payload a single event may carry
    pub max_event_length: usize,
    /// Frames processed per drain cycle
    pub reader_frame_limit: usize,
    /// Read cycles attempted by the final flush on shutdown
    pub shutdown_flush_cycles: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            enabled_events: String::new(),
            reader: ReaderKind::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_event_length: DEFAULT_MAX_EVENT_LENGTH,
            reader_frame_limit: DEFAULT_READER_FRAME_LIMIT,
            shutdown_flush_cycles: DEFAULT_SHUTDOWN_FLUSH_CYCLES,
        }
    }
}

impl EventConfig {
    /// Create a config with the given enabled-events expression
    pub fn new(enabled_events: impl Into<String>) -> Self {
        Self {
            enabled_events: enabled_events.into(),
            ..Default::default()
        }
    }

    /// Load from `EVLOG_*` environment variables, defaulting unset values
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup (environment, property map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENABLED_EVENTS_ENV) {
            config.enabled_events = value;
        }
        if let Some(value) = lookup(READER_ENV) {
            config.reader = value.parse()?;
        }
        if let Some(value) = lookup(BUFFER_CAPACITY_ENV) {
            config.buffer_capacity = parse_size("buffer_capacity", &value)?;
        }
        if let Some(value) = lookup(MAX_EVENT_LENGTH_ENV) {
            config.max_event_length = parse_size("max_event_length", &value)?;
        }
        if let Some(value) = lookup(READER_FRAME_LIMIT_ENV) {
            config.reader_frame_limit = parse_size("reader_frame_limit", &value)?;
        }
        if let Some(value) = lookup(SHUTDOWN_FLUSH_CYCLES_ENV) {
            config.shutdown_flush_cycles = parse_size("shutdown_flush_cycles", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the enabled-events expression
    pub fn with_enabled_events(mut self, expression: impl Into<String>) -> Self {
        self.enabled_events = expression.into();
        self
    }

    /// Set the default reader
    pub fn with_reader(mut self, reader: ReaderKind) -> Self {
        self.reader = reader;
        self
    }

    /// Set the ring buffer capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the maximum event payload length
    pub fn with_max_event_length(mut self, length: usize) -> Self {
        self.max_event_length = length;
        self
    }

    /// Set the per-cycle frame limit
    pub fn with_reader_frame_limit(mut self, limit: usize) -> Self {
        self.reader_frame_limit = limit;
        self
    }

    /// Set the number of final flush cycles
    pub fn with_shutdown_flush_cycles(mut self, cycles: usize) -> Self {
        self.shutdown_flush_cycles = cycles;
        self
    }

    /// Check value ranges that do not depend on the registry
    ///
    /// The ring buffer performs its own layout checks when it is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.buffer_capacity.is_power_of_two() {
            return Err(ConfigError::InvalidValue {
                key: "buffer_capacity",
                value: self.buffer_capacity.to_string(),
            });
        }
        // A full-size frame must fit in half the buffer
        let max_frame_payload = (self.buffer_capacity / 2).saturating_sub(FRAME_HEADER_LENGTH);
        if self.max_event_length > max_frame_payload {
            return Err(ConfigError::Invalid(format!(
                "max_event_length {} exceeds {} for buffer_capacity {}",
                self.max_event_length, max_frame_payload, self.buffer_capacity
            )));
        }
        if self.reader_frame_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reader_frame_limit",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the enabled-events expression against a registry
    pub fn enablement_filter(
        &self,
        registry: &EventCodeRegistry,
    ) -> Result<EnablementFilter, ConfigError> {
        EnablementFilter::parse(&self.enabled_events, registry)
    }
}

fn parse_size(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = EventConfig::default();
        assert!(config.enabled_events.is_empty());
        assert_eq!(config.reader, ReaderKind::Logging);
        assert_eq!(config.reader_frame_limit, DEFAULT_READER_FRAME_LIMIT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENABLED_EVENTS_ENV, "CMD_IN_KEEP_ALIVE,27"),
            (READER_ENV, "null"),
            (BUFFER_CAPACITY_ENV, "65536"),
            (READER_FRAME_LIMIT_ENV, " 4 "),
        ]
        .into_iter()
        .collect();

        let config = EventConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.enabled_events, "CMD_IN_KEEP_ALIVE,27");
        assert_eq!(config.reader, ReaderKind::Null);
        assert_eq!(config.buffer_capacity, 65536);
        assert_eq!(config.reader_frame_limit, 4);
        assert_eq!(config.max_event_length, DEFAULT_MAX_EVENT_LENGTH);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = EventConfig::from_lookup(|k| (k == READER_ENV).then(|| "fancy".to_string()))
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownReader("fancy".to_string()));

        let err =
            EventConfig::from_lookup(|k| (k == BUFFER_CAPACITY_ENV).then(|| "lots".to_string()))
                .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "buffer_capacity",
                ..
            }
        ));
    }

    #[test]
    fn test_from_toml() {
        let config = EventConfig::from_toml_str(
            r#"
            enabled_events = "all"
            reader = "null"
            buffer_capacity = 1024
            max_event_length = 128
            "#,
        )
        .unwrap();
        assert_eq!(config.enabled_events, "all");
        assert_eq!(config.reader, ReaderKind::Null);
        assert_eq!(config.buffer_capacity, 1024);
        assert_eq!(config.shutdown_flush_cycles, DEFAULT_SHUTDOWN_FLUSH_CYCLES);
    }

    #[test]
    fn test_from_toml_parse_error() {
        let err = EventConfig::from_toml_str("buffer_capacity = \"big\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validate() {
        let config = EventConfig::default().with_buffer_capacity(1000);
        assert!(config.validate().is_err());

        let config = EventConfig::default()
            .with_buffer_capacity(1024)
            .with_max_event_length(1024);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = EventConfig::default()
            .with_buffer_capacity(1024)
            .with_max_event_length(505);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(config.with_max_event_length(504).validate().is_ok());

        let config = EventConfig::default().with_reader_frame_limit(0);
        assert!(config.validate().is_err());
    }
}
