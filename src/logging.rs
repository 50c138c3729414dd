//! Structured Logging Setup
//!
//! Initializes the global `tracing` subscriber. `RUST_LOG` overrides the
//! configured level when set, so operators can raise verbosity per target
//! without touching service configuration.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Logging initialization errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    Init(String),
}

/// Initialize the global tracing subscriber
///
/// `level` is the default filter applied when `RUST_LOG` is not set.
/// Calling this more than once is an error.
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dutchbid={level},info")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}
