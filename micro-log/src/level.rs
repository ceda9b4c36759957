//! Log severity levels.

use micro_common::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;

/// Target carried by events logged at [`LogLevel::Fatal`].
///
/// `tracing` has no level above `ERROR`, so fatal events are `ERROR` events
/// on this target; filters and the line formatter key off it.
pub const FATAL_TARGET: &str = "micro_log::fatal";

/// Target of the span opened by [`RequestContext::span`](crate::RequestContext::span).
///
/// Every level admits it, so request fields reach lines logged inside the
/// span whatever the configured minimum.
pub const REQUEST_SPAN_TARGET: &str = "micro_log::request_scope";

/// Minimum severity written to the sink.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug level
    Debug,
    /// Info level
    #[default]
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
    /// Fatal level
    Fatal,
}

impl LogLevel {
    /// All levels from least to most severe.
    pub const ALL: [Self; 5] = [Self::Debug, Self::Info, Self::Warn, Self::Error, Self::Fatal];

    /// Convert to the tag printed in each line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Per-layer filter admitting this level and everything more severe.
    #[must_use]
    pub fn targets(self) -> Targets {
        let targets = match self {
            Self::Debug => Targets::new().with_default(LevelFilter::DEBUG),
            Self::Info => Targets::new().with_default(LevelFilter::INFO),
            Self::Warn => Targets::new().with_default(LevelFilter::WARN),
            Self::Error => Targets::new().with_default(LevelFilter::ERROR),
            Self::Fatal => Targets::new().with_target(FATAL_TARGET, LevelFilter::ERROR),
        };
        targets.with_target(REQUEST_SPAN_TARGET, LevelFilter::TRACE)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    /// Accepts level names in any case, `warning`, and the legacy numeric
    /// scale where `-1` is debug and `3` is fatal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i8>() {
            return Self::try_from(n);
        }
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" | "panic" => Ok(Self::Fatal),
            _ => Err(ConfigError::unknown_variant("log level", s)),
        }
    }
}

impl TryFrom<i8> for LogLevel {
    type Error = ConfigError;

    fn try_from(n: i8) -> Result<Self, ConfigError> {
        match n {
            -1 => Ok(Self::Debug),
            0 => Ok(Self::Info),
            1 => Ok(Self::Warn),
            2 => Ok(Self::Error),
            3 => Ok(Self::Fatal),
            _ => Err(ConfigError::unknown_variant("log level", n.to_string())),
        }
    }
}
