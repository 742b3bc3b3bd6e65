//! Tracing and logging setup
//!
//! One subscriber per process: an `EnvFilter` (from `RUST_LOG`, falling back
//! to the configured directive) feeding either a human-readable or a JSON
//! formatter.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::Environment;

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. "info,inbox_service=debug")
    pub directive: String,
    /// Emit one JSON object per event
    pub json: bool,
    /// Log span open/close events
    pub span_events: bool,
    /// Include file and line numbers
    pub file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            directive: "info".to_string(),
            json: false,
            span_events: false,
            file_line: true,
        }
    }
}

impl TracingConfig {
    /// Verbose human-readable output for local work
    #[must_use]
    pub fn development() -> Self {
        Self {
            directive: "info,inbox_service=debug,inbox_gateway=debug,inbox_db=debug".to_string(),
            json: false,
            span_events: true,
            file_line: true,
        }
    }

    /// Structured JSON output for log shippers
    #[must_use]
    pub fn production() -> Self {
        Self {
            directive: "info".to_string(),
            json: true,
            span_events: false,
            file_line: false,
        }
    }

    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self::development(),
            Environment::Staging => Self::default(),
            Environment::Production => Self::production(),
        }
    }
}

/// Initialize tracing with the default configuration
///
/// Safe to call more than once; later calls return `AlreadyInitialized`.
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

pub fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.directive))
        .map_err(|e| TracingError::InvalidDirective(e.to_string()))?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_file(config.file_line)
        .with_line_number(config.file_line)
        .with_span_events(span_events);

    let fmt_layer = if config.json {
        fmt_layer.json().boxed()
    } else {
        fmt_layer.boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,

    #[error("Invalid log filter directive: {0}")]
    InvalidDirective(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_follow_environment() {
        assert!(!TracingConfig::for_environment(Environment::Development).json);
        assert!(TracingConfig::for_environment(Environment::Development).span_events);
        assert!(TracingConfig::for_environment(Environment::Production).json);
        assert_eq!(TracingConfig::for_environment(Environment::Staging).directive, "info");
    }

    #[test]
    fn test_presets_parse_as_filters() {
        for config in [TracingConfig::development(), TracingConfig::production()] {
            assert!(EnvFilter::try_new(&config.directive).is_ok());
        }
    }
}
