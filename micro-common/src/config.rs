//! Environment-backed configuration helpers.
//!
//! Every configuration type in the workspace is an explicit value built once
//! at startup. `Env` is the single place that reads variables, so loaders can
//! be exercised with an in-memory lookup instead of the process environment.

use crate::ConfigError;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Source of configuration variables.
pub struct Env<F = fn(&str) -> Option<String>> {
    lookup: F,
}

impl Env {
    /// Read from the process environment, loading `.env` first if present.
    #[must_use]
    pub fn process() -> Self {
        dotenvy::dotenv().ok();
        Self {
            lookup: |name| std::env::var(name).ok(),
        }
    }
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Read variables through a custom lookup.
    pub const fn from_fn(lookup: F) -> Self {
        Self { lookup }
    }

    /// Raw value of a variable, with surrounding whitespace removed.
    /// Empty values are treated as unset.
    pub fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Value of a variable or the given default.
    pub fn string(&self, name: &str, default: &str) -> String {
        self.var(name).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if the value is set but malformed.
    pub fn parse<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.var(name) {
            Some(val) => val.parse().map_err(|e: T::Err| ConfigError::ParseError {
                name: name.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    /// Parse a millisecond count into a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if the value is not an integer.
    pub fn duration_ms(&self, name: &str, default: Duration) -> Result<Duration, ConfigError> {
        let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        self.parse(name, default_ms).map(Duration::from_millis)
    }

    /// Parse a comma-separated list. Blank entries are skipped.
    pub fn list(&self, name: &str) -> Vec<String> {
        self.var(name)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Parse a backend address, accepting bare `host:port` values.
///
/// Addresses without a scheme are treated as plain HTTP. The returned URL has
/// no trailing slash in its path, so callers can append API paths directly.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUrl`] if the address has no host or cannot
/// be parsed.
pub fn parse_address(field: &str, addr: &str) -> Result<Url, ConfigError> {
    let addr = addr.trim();
    if addr.is_empty() {
        return Err(ConfigError::invalid_url(field, "empty address"));
    }

    let candidate = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };

    let url = Url::parse(&candidate).map_err(|e| ConfigError::invalid_url(field, e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid_url(field, format!("no host in {addr}")));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid_url(
            field,
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url)
}

/// Render a parsed address as a base string without trailing slash.
#[must_use]
pub fn address_base(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}
