//! RPC error types using thiserror 2.0.
//!
//! Every way a call can fail has its own variant, so callers can tell a
//! breaker rejection from a dead backend from a bad payload.

use micro_common::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// RPC invocation errors.
#[derive(Error, Debug)]
pub enum RpcError {
    /// No discovery backend answered
    #[error("Discovery failed for {service}: {reason}")]
    Discovery {
        /// Service being resolved
        service: String,
        /// Last backend failure
        reason: String,
    },

    /// The registry knows no live node for the service
    #[error("No instances available for service: {0}")]
    NoInstances(String),

    /// The command's circuit is open; nothing was attempted
    #[error("Circuit open for command: {0}")]
    CircuitOpen(String),

    /// The command already has the maximum number of calls in flight
    #[error("Max concurrency reached for command: {0}")]
    MaxConcurrency(String),

    /// The call did not finish within the breaker timeout
    #[error("Command {command} timed out after {timeout:?}")]
    Timeout {
        /// Breaker command name
        command: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// Connection or I/O failure talking to the node
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a non-success status
    #[error("Status {status} from {url}: {body}")]
    Status {
        /// Target URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The response body was not the expected JSON
    #[error("Decode error: {0}")]
    Decode(String),

    /// The request body could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// Invalid client configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

impl RpcError {
    /// Whether the breaker refused the call without attempting it.
    #[must_use]
    pub const fn is_breaker_rejection(&self) -> bool {
        matches!(self, Self::CircuitOpen(_) | Self::MaxConcurrency(_))
    }

    /// Whether trying again later could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Discovery { .. }
            | Self::NoInstances(_)
            | Self::CircuitOpen(_)
            | Self::MaxConcurrency(_)
            | Self::Timeout { .. }
            | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::Encode(_) | Self::Config(_) => false,
        }
    }

    /// Create a discovery error.
    #[must_use]
    pub fn discovery(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Discovery {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
