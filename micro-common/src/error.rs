//! Configuration error type shared by all micro-kit crates.
//!
//! Configuration problems are detected once, at startup, and are expected to
//! halt initialisation. Nothing in this module is raised on a per-call path.

use thiserror::Error;

/// Error raised while building or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A URL or network address could not be parsed
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Configuration field holding the address
        field: String,
        /// Parser message
        reason: String,
    },

    /// A value parsed but is outside its allowed range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Configuration field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// An enumerated setting holds an unknown selector
    #[error("Unknown {field}: {value}")]
    UnknownVariant {
        /// Configuration field
        field: String,
        /// The rejected selector
        value: String,
    },

    /// A required setting is missing
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown variant error.
    #[must_use]
    pub fn unknown_variant(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an invalid URL error.
    #[must_use]
    pub fn invalid_url(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::unknown_variant("registry", "zookeeper");
        assert_eq!(err.to_string(), "Unknown registry: zookeeper");

        let err = ConfigError::invalid_value("max_backups", "must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid value for max_backups: must be positive"
        );

        let err = ConfigError::MissingRequired("etcd_addrs".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: etcd_addrs"
        );
    }

    #[test]
    fn test_invalid_url_display() {
        let err = ConfigError::invalid_url("CONSUL_ADDRS", "empty host");
        assert_eq!(err.to_string(), "Invalid URL for CONSUL_ADDRS: empty host");
    }
}
