//! Formatting layers for console and file output
//!
//! Layers are boxed so the subscriber builder can assemble any combination
//! of outputs into a single `Vec` instead of spelling out every combination
//! as a distinct type.

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;

use crate::config::{ConsoleConfig, FileConfig, JsonlConfig};
use crate::error::LoggingError;

/// A type-erased layer over subscriber `S`
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Console layer: pretty text or JSONL depending on `console.pretty`
pub fn console_layer<S>(console: &ConsoleConfig, jsonl: &JsonlConfig) -> BoxedLayer<S>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    if console.pretty {
        fmt::layer()
            .with_ansi(console.ansi)
            .with_target(true)
            .with_thread_names(jsonl.include_thread_info)
            .boxed()
    } else {
        jsonl_layer(std::io::stdout, jsonl)
    }
}

/// JSONL layer writing to any `MakeWriter`
///
/// Configures tracing-subscriber's JSON formatter with settings suited to
/// log aggregation: one object per line, no ANSI escapes.
pub fn jsonl_layer<S, W>(writer: W, jsonl: &JsonlConfig) -> BoxedLayer<S>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_current_span(true)
        .with_span_list(jsonl.include_spans)
        .flatten_event(jsonl.flatten_events)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_thread_ids(jsonl.include_thread_info)
        .with_thread_names(jsonl.include_thread_info)
        .with_writer(writer)
        .boxed()
}

/// Non-blocking rolling file writer
///
/// The returned guard flushes pending lines when dropped and must outlive
/// the subscriber.
pub fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }

    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}
