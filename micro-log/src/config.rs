//! Logger configuration.

use crate::level::LogLevel;
use crate::rotation::RotationPolicy;
use micro_common::{ConfigError, Env};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const BYTES_PER_MB: u64 = 1024 * 1024;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Logger configuration.
///
/// Built once at startup and handed to [`crate::Logger::init`]. Zero for
/// `max_age_days` or `max_backups` disables that limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Directory holding the active file and its backups
    pub output_dir: PathBuf,
    /// Process name; names the log file and prefixes request ids
    pub process_name: String,
    /// Days a rotated backup is kept
    pub max_age_days: u32,
    /// Size in megabytes at which the active file is rotated
    pub max_size_mb: u64,
    /// Number of rotated backups kept
    pub max_backups: usize,
    /// Minimum severity written
    pub level: LogLevel,
    /// Also write every line to stdout
    pub console: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./logs"),
            process_name: "app".to_string(),
            max_age_days: 7,
            max_size_mb: 512,
            max_backups: 5,
            level: LogLevel::Info,
            console: false,
        }
    }
}

impl LoggerConfig {
    /// Create a configuration for `process_name` writing under `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, process_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            process_name: process_name.into(),
            ..Default::default()
        }
    }

    /// Load from `LOG_DIR`, `LOG_PROCESS_NAME`, `LOG_MAX_AGE_DAYS`,
    /// `LOG_MAX_SIZE_MB`, `LOG_MAX_BACKUPS`, `LOG_LEVEL` and `LOG_CONSOLE`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the result fails
    /// validation.
    pub fn from_env<F>(env: &Env<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            output_dir: env
                .var("LOG_DIR")
                .map_or(defaults.output_dir, PathBuf::from),
            process_name: env.string("LOG_PROCESS_NAME", &defaults.process_name),
            max_age_days: env.parse("LOG_MAX_AGE_DAYS", defaults.max_age_days)?,
            max_size_mb: env.parse("LOG_MAX_SIZE_MB", defaults.max_size_mb)?,
            max_backups: env.parse("LOG_MAX_BACKUPS", defaults.max_backups)?,
            level: env.parse("LOG_LEVEL", defaults.level)?,
            console: env.parse("LOG_CONSOLE", defaults.console)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the process name is empty or contains a
    /// path separator, or the size limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired("process_name".to_string()));
        }
        if self.process_name.contains(['/', '\\']) {
            return Err(ConfigError::invalid_value(
                "process_name",
                "must not contain path separators",
            ));
        }
        if self.max_size_mb == 0 {
            return Err(ConfigError::invalid_value(
                "max_size_mb",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Set the minimum level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the rotation thresholds.
    #[must_use]
    pub const fn with_rotation(mut self, max_age_days: u32, max_size_mb: u64, max_backups: usize) -> Self {
        self.max_age_days = max_age_days;
        self.max_size_mb = max_size_mb;
        self.max_backups = max_backups;
        self
    }

    /// Echo lines to stdout as well as the file.
    #[must_use]
    pub const fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Path of the active log file.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.output_dir.join(format!("{}.log", self.process_name))
    }

    /// Rotation thresholds in sink units.
    #[must_use]
    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy {
            max_size: self.max_size_mb.saturating_mul(BYTES_PER_MB),
            max_age: (self.max_age_days > 0)
                .then(|| Duration::from_secs(u64::from(self.max_age_days) * SECS_PER_DAY)),
            max_backups: self.max_backups,
        }
    }
}
