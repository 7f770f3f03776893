//! Structured logging for the shift search and tile processing
//!
//! Console output through `tracing-subscriber`, optional JSON log files
//! through `tracing-appender`, and a per-thread correlation id so the
//! records of one tile can be picked out of a parallel batch.

pub mod config;
pub mod spans;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

pub use config::LoggingConfig;
pub use spans::ShiftSearchSpan;

thread_local! {
    static CORRELATION_ID: std::cell::RefCell<Option<Uuid>> = const { std::cell::RefCell::new(None) };
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept
/// alive for as long as file logging is wanted.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directives()))?;

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(config.include_file_location)
            .with_file(config.include_file_location);
        layers.push(console_layer.boxed());
    }

    let mut guard = None;
    if let Some(ref log_dir) = config.log_directory {
        let file_appender = tracing_appender::rolling::daily(log_dir, "tile-shift.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .json();
        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Logging already initialized: {}", e))?;

    tracing::debug!("Logging system initialized with config: {:?}", config);
    Ok(guard)
}

/// Set a correlation ID for the current thread
pub fn set_correlation_id(id: Uuid) {
    CORRELATION_ID.with(|correlation_id| {
        *correlation_id.borrow_mut() = Some(id);
    });
}

/// Get the current correlation ID for this thread
pub fn get_correlation_id() -> Option<Uuid> {
    CORRELATION_ID.with(|correlation_id| *correlation_id.borrow())
}

/// Generate a new correlation ID and set it for the current thread
pub fn new_correlation_id() -> Uuid {
    let id = Uuid::new_v4();
    set_correlation_id(id);
    id
}

/// Clear the correlation ID for the current thread
pub fn clear_correlation_id() {
    CORRELATION_ID.with(|correlation_id| {
        *correlation_id.borrow_mut() = None;
    });
}

/// Create a span with correlation ID automatically included
#[macro_export]
macro_rules! correlation_span {
    ($level:expr, $name:expr) => {
        if let Some(correlation_id) = $crate::logging::get_correlation_id() {
            tracing::span!($level, $name, correlation_id = %correlation_id)
        } else {
            tracing::span!($level, $name)
        }
    };
    ($level:expr, $name:expr, $($field:tt)*) => {
        if let Some(correlation_id) = $crate::logging::get_correlation_id() {
            tracing::span!($level, $name, correlation_id = %correlation_id, $($field)*)
        } else {
            tracing::span!($level, $name, $($field)*)
        }
    };
}
