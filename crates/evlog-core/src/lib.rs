//! # Evlog Core
//!
//! Event codes, enablement filtering, payload codecs and dispatch contracts
//! shared by the evlog transport, agent and logging crates.
//!
//! ## Key Types
//!
//! - [`EventCode`]: Stable id + name + category identifying a kind of event
//! - [`EventCodeRegistry`]: Immutable, dense id → code mapping built at startup
//! - [`EnablementFilter`]: Hot-path check deciding whether an event is captured
//! - [`EventConfig`]: Configuration read once at process start
//!
//! ## Key Traits
//!
//! - [`MessageHandler`]: Receives decoded frames on the drain side
//! - [`ErrorSink`]: Fallback path for decode and handler failures
//! - [`EventPayload`]: Allocation-free payload encoding

pub mod archive;
pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod registry;
pub mod traits;

// Re-export main types
pub use codec::{
    ConnectRequest, ControlRequest, ControlResponse, EventPayload, ResponseCode, SessionState,
    SessionStateChange, dissect,
};
pub use config::{EventConfig, ReaderKind};
pub use error::*;
pub use event::*;
pub use filter::EnablementFilter;
pub use registry::{EventCodeRegistry, EventCodeRegistryBuilder, UNKNOWN_EVENT_NAME};
pub use traits::*;
