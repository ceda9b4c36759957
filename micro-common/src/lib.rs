//! Shared building blocks for micro-kit crates.
//!
//! This crate provides centralized implementations for:
//! - Configuration errors and environment parsing helpers
//! - HTTP client configuration and building
//! - Circuit breaker with rolling-window health and per-command grouping

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod http;

pub use circuit_breaker::{
    BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerGroup, CircuitState,
};
pub use config::Env;
pub use error::ConfigError;
pub use http::{HttpConfig, build_http_client};
