//! Logging setup for the command-line tool.
//!
//! Installs a global tracing subscriber writing to stderr, so stdout only carries
//! the final confirmation line. `RUST_LOG` takes precedence over the level passed in.

use tracing_subscriber::EnvFilter;

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The fallback level is not a valid filter directive.
    #[error("Invalid log level `{level}`: {source}")]
    InvalidLevel {
        level: String,
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber was already installed.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(String),
}

/// Initialize tracing with `RUST_LOG`, falling back to `level` (e.g. `info`).
pub fn init(level: &str) -> Result<(), LoggingError> {
    let env_filter = build_env_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| LoggingError::SetGlobal(err.to_string()))
}

fn build_env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidLevel {
            level: level.to_string(),
            source,
        }),
    }
}
