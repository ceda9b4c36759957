//! HTTP client configuration shared by the RPC invoker and discovery backends.

use crate::{ConfigError, Env};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Media type used for every RPC payload.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP client configuration.
///
/// The request timeout here is a transport backstop; outbound RPCs are also
/// bounded by the circuit breaker's own timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 3s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(3),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("micro-kit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Load from `HTTP_TIMEOUT_MS`, `HTTP_CONNECT_TIMEOUT_MS` and
    /// `HTTP_USER_AGENT`, keeping defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or a timeout is zero.
    pub fn from_env<F>(env: &Env<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            timeout: env.duration_ms("HTTP_TIMEOUT_MS", defaults.timeout)?,
            connect_timeout: env.duration_ms("HTTP_CONNECT_TIMEOUT_MS", defaults.connect_timeout)?,
            user_agent: env.string("HTTP_USER_AGENT", &defaults.user_agent),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid_value("http.timeout", "must be greater than 0"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "http.connect_timeout",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Build a configured HTTP client.
///
/// Every request sent through the client advertises JSON in its `Accept`
/// header.
///
/// # Errors
///
/// Returns an error if the client cannot be built (e.g., TLS initialization fails).
///
/// # Examples
///
/// ```
/// use micro_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(5));
/// let client = build_http_client(&config).expect("Failed to build client");
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

    ClientBuilder::new()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(config.user_agent.starts_with("micro-kit/"));
    }

    #[test]
    fn test_from_env() {
        let env = Env::from_fn(|name| match name {
            "HTTP_TIMEOUT_MS" => Some("1500".to_string()),
            "HTTP_USER_AGENT" => Some("orders-api".to_string()),
            _ => None,
        });
        let config = HttpConfig::from_env(&env).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.user_agent, "orders-api");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let env = Env::from_fn(|name| (name == "HTTP_TIMEOUT_MS").then(|| "0".to_string()));
        assert!(matches!(
            HttpConfig::from_env(&env),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_build_client() {
        let config = HttpConfig::default();
        assert!(build_http_client(&config).is_ok());
    }
}
