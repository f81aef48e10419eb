//! # Evlog Agent
//!
//! Producer API, drain agent and runners for the evlog event transport.
//!
//! Instrumented code logs through an [`EventLog`]: a filter check, a
//! non-blocking claim in the ring buffer and an in-place encode. A reader
//! agent running on its own thread drains the buffer into a
//! [`MessageHandler`], by default the tracing-based text logger.
//!
//! ## Example
//!
//! ```rust,ignore
//! use evlog_agent::{EventLogAgent, EventConfig};
//! use evlog_core::archive::CMD_IN_KEEP_ALIVE;
//!
//! let agent = EventLogAgent::builder(EventConfig::new("control-session"))
//!     .with_global(true)
//!     .start()?;
//!
//! agent.event_log().archive().control_request(CMD_IN_KEEP_ALIVE, 7, 42);
//!
//! // Stops the reader after a bounded final flush
//! agent.close();
//! ```

pub mod agent;
pub mod dispatch;
pub mod error;
pub mod global;
pub mod producer;
pub mod runner;

// Re-export main types
pub use agent::{Agent, EventLogReaderAgent};
pub use dispatch::{CountDownLatch, ExpectationHandler};
pub use error::{AgentError, AgentResult};
pub use producer::{ArchiveEventLogger, EventLog, LogOutcome};
pub use runner::{AgentRunner, AsyncAgentRunner, BackoffIdle, IdleStrategy, SleepingIdle};

pub use evlog_core::{EventConfig, MessageHandler, ReaderKind};

use std::sync::Arc;

use tracing::info;

use evlog_core::{ErrorSink, EventCodeRegistry, NullHandler};
use evlog_logging::{TracingErrorSink, TracingEventHandler};

/// Builder for [`EventLogAgent`]
pub struct EventLogAgentBuilder {
    config: EventConfig,
    registry: Option<Arc<EventCodeRegistry>>,
    handler: Option<Box<dyn MessageHandler>>,
    error_sink: Option<Box<dyn ErrorSink>>,
    idle: Option<Box<dyn IdleStrategy>>,
    install_global: bool,
}

impl EventLogAgentBuilder {
    fn new(config: EventConfig) -> Self {
        Self {
            config,
            registry: None,
            handler: None,
            error_sink: None,
            idle: None,
            install_global: false,
        }
    }

    /// Event code catalogue; the archive catalogue when not set
    pub fn with_registry(mut self, registry: Arc<EventCodeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Drain handler, overriding the configured [`ReaderKind`]
    pub fn with_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Sink for handler failures; warnings through `tracing` when not set
    pub fn with_error_sink(mut self, error_sink: impl ErrorSink + 'static) -> Self {
        self.error_sink = Some(Box::new(error_sink));
        self
    }

    /// Reader thread idle strategy; [`BackoffIdle`] when not set
    pub fn with_idle_strategy(mut self, idle: impl IdleStrategy + 'static) -> Self {
        self.idle = Some(Box::new(idle));
        self
    }

    /// Install the event log as the process-wide instance
    pub fn with_global(mut self, install: bool) -> Self {
        self.install_global = install;
        self
    }

    /// Build the event log and start the reader thread
    pub fn start(self) -> AgentResult<EventLogAgent> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(EventCodeRegistry::archive()?),
        };
        let log = Arc::new(EventLog::from_config(&self.config, Arc::clone(&registry))?);

        let handler: Box<dyn MessageHandler> = match self.handler {
            Some(handler) => handler,
            None => match self.config.reader {
                ReaderKind::Logging => Box::new(TracingEventHandler::new(Arc::clone(&registry))),
                ReaderKind::Null => Box::new(NullHandler),
            },
        };
        let error_sink: Box<dyn ErrorSink> = match self.error_sink {
            Some(error_sink) => error_sink,
            None => Box::new(TracingErrorSink),
        };
        let idle: Box<dyn IdleStrategy> = match self.idle {
            Some(idle) => idle,
            None => Box::new(BackoffIdle::default()),
        };

        if self.install_global {
            global::init(Arc::clone(&log))?;
        }

        let agent = EventLogReaderAgent::new(Arc::clone(&log), handler, error_sink)
            .with_frame_limit(self.config.reader_frame_limit)
            .with_shutdown_flush_cycles(self.config.shutdown_flush_cycles);

        let runner = match AgentRunner::start(agent, idle) {
            Ok(runner) => runner,
            Err(e) => {
                if self.install_global {
                    global::reset_if(&log);
                }
                return Err(e);
            }
        };

        info!(
            enabled = log.filter().enabled_count(),
            all = log.filter().is_all(),
            reader = %self.config.reader,
            capacity = log.ring().capacity(),
            global = self.install_global,
            "Event log agent started"
        );

        Ok(EventLogAgent {
            log,
            runner,
            installed_global: self.install_global,
        })
    }
}

/// A running event log with its reader thread
///
/// Dropping the agent has the same effect as [`close`](Self::close).
pub struct EventLogAgent {
    log: Arc<EventLog>,
    runner: AgentRunner,
    installed_global: bool,
}

impl EventLogAgent {
    pub fn builder(config: EventConfig) -> EventLogAgentBuilder {
        EventLogAgentBuilder::new(config)
    }

    /// Start with configuration from `EVLOG_*` environment variables
    pub fn start_from_env() -> AgentResult<Self> {
        Self::builder(EventConfig::from_env()?).start()
    }

    /// The shared event log producers write to
    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    /// Stop the reader after its final flush and clear the global slot
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.installed_global {
            global::reset_if(&self.log);
            self.installed_global = false;
        }
        self.runner.close();
    }
}

impl Drop for EventLogAgent {
    fn drop(&mut self) {
        self.shutdown();
    }
}
