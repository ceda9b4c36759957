//! Leveled logging with request correlation and a rotating file sink.
//!
//! A process builds one [`LoggerConfig`], calls [`Logger::init`] once, and
//! keeps the returned [`Logger`] alive. Each unit of work gets a
//! [`RequestContext`] whose id is attached to its log lines, either per call
//! (`info!(ctx: &ctx, ...)`) or for a whole scope ([`RequestContext::span`]).
//!
//! Lines are written by a background worker to `{output_dir}/{process}.log`,
//! rotated by size, with backups pruned by count and age. Logging never
//! returns errors to the caller; events emitted before [`Logger::init`] are
//! discarded.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod level;
pub mod logger;
mod macros;
pub mod request_id;
pub mod rotation;

pub use config::LoggerConfig;
pub use context::RequestContext;
pub use error::{LogError, LogResult};
pub use format::{LineFormat, thread_tag};
pub use level::{FATAL_TARGET, LogLevel, REQUEST_SPAN_TARGET};
pub use logger::{Logger, is_initialized, line_layer};
pub use rotation::{Backup, RotatingFileWriter, RotationPolicy};

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
