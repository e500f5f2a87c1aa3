//! Structured logging with JSON or pretty output.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level. `RUST_LOG` wins when set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter)?,
        LogFormat::Pretty => init_pretty_logging(filter)?,
    }

    tracing::debug!(
        service = %config.service_name,
        format = ?config.log_format,
        "logging initialized"
    );
    Ok(())
}

/// Initialize JSON logging for production.
fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Initialize pretty logging for development.
fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A source document has been fetched and parsed.
    pub const DOCUMENT_LOADED: &str = "document_loaded";

    /// A schema has been compiled from a document.
    pub const SCHEMA_COMPILED: &str = "schema_compiled";

    /// A compiled schema was served from cache.
    pub const SCHEMA_CACHE_HIT: &str = "schema_cache_hit";

    /// A compiled schema was missing from cache.
    pub const SCHEMA_CACHE_MISS: &str = "schema_cache_miss";

    /// A message did not conform to its definition.
    pub const VALIDATION_FAILURE: &str = "validation_failure";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_document_loaded {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::DOCUMENT_LOADED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_schema_compiled {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::SCHEMA_COMPILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_schema_cache_hit {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::SCHEMA_CACHE_HIT,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_schema_cache_miss {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::SCHEMA_CACHE_MISS,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_validation_failure {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::VALIDATION_FAILURE,
            $($field)*
        )
    };
}
