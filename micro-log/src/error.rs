//! Logger error types.

use micro_common::ConfigError;
use thiserror::Error;

/// Errors raised while setting up the logger.
///
/// Nothing on the logging path itself returns an error: once the logger is
/// running, sink failures are absorbed by the writer.
#[derive(Error, Debug)]
pub enum LogError {
    /// The log directory or file could not be created
    #[error("Log sink unavailable: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid logger configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A global logger was already installed
    #[error("Logger already initialized")]
    AlreadyInitialized,
}

/// Result type for logger setup.
pub type LogResult<T> = Result<T, LogError>;
