//! RPC client configuration.

use crate::selector::SelectorStrategy;
use micro_common::config::parse_address;
use micro_common::{CircuitBreakerConfig, ConfigError, Env, HttpConfig};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Discovery backend used to resolve services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegistryKind {
    /// etcd v3, through its JSON gateway
    #[default]
    Etcd,
    /// Consul health API
    Consul,
    /// Fixed in-process map
    Static,
}

impl RegistryKind {
    /// Configuration name of the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Etcd => "etcd",
            Self::Consul => "consul",
            Self::Static => "static",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistryKind {
    type Err = ConfigError;

    /// Accepts backend names and the numeric codes `0` (etcd) and `1` (consul).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "etcd" | "0" => Ok(Self::Etcd),
            "consul" | "1" => Ok(Self::Consul),
            "static" | "memory" => Ok(Self::Static),
            other => Err(ConfigError::unknown_variant("registry type", other)),
        }
    }
}

/// RPC client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    /// Discovery backend
    pub registry: RegistryKind,
    /// etcd gateway addresses, tried in order
    pub etcd_addrs: Vec<String>,
    /// Consul agent addresses, tried in order
    pub consul_addrs: Vec<String>,
    /// Service → node addresses for the static registry
    pub static_nodes: HashMap<String, Vec<String>>,
    /// Settings shared by every command's circuit breaker
    pub breaker: CircuitBreakerConfig,
    /// Node selection strategy
    pub selector: SelectorStrategy,
    /// Outbound HTTP settings
    pub http: HttpConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            registry: RegistryKind::Etcd,
            etcd_addrs: vec!["127.0.0.1:2379".to_string()],
            consul_addrs: vec!["127.0.0.1:8500".to_string()],
            static_nodes: HashMap::new(),
            breaker: CircuitBreakerConfig::default(),
            selector: SelectorStrategy::RoundRobin,
            http: HttpConfig::default(),
        }
    }
}

impl RpcConfig {
    /// Load from the environment, keeping defaults for anything unset.
    ///
    /// Reads `REGISTRY_TYPE`, `ETCD_ADDRS`, `CONSUL_ADDRS`, `STATIC_NODES`
    /// (`service=host:port` pairs, comma separated), the `BREAKER_*`
    /// settings, `SELECTOR_STRATEGY` and the `HTTP_*` settings.
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
        let breaker = CircuitBreakerConfig::default()
            .with_timeout(env.duration_ms("BREAKER_TIMEOUT_MS", defaults.breaker.timeout)?)
            .with_sleep_window(env.duration_ms("BREAKER_SLEEP_WINDOW_MS", defaults.breaker.sleep_window)?)
            .with_volume_threshold(env.parse(
                "BREAKER_VOLUME_THRESHOLD",
                defaults.breaker.request_volume_threshold,
            )?)
            .with_error_percent_threshold(env.parse(
                "BREAKER_ERROR_PERCENT",
                defaults.breaker.error_percent_threshold,
            )?)
            .with_max_concurrent_requests(env.parse(
                "BREAKER_MAX_CONCURRENT",
                defaults.breaker.max_concurrent_requests,
            )?);

        let etcd_addrs = env.list("ETCD_ADDRS");
        let consul_addrs = env.list("CONSUL_ADDRS");

        let config = Self {
            registry: env
                .var("REGISTRY_TYPE")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(defaults.registry),
            etcd_addrs: if etcd_addrs.is_empty() {
                defaults.etcd_addrs
            } else {
                etcd_addrs
            },
            consul_addrs: if consul_addrs.is_empty() {
                defaults.consul_addrs
            } else {
                consul_addrs
            },
            static_nodes: parse_static_nodes(&env.list("STATIC_NODES"))?,
            breaker,
            selector: env
                .var("SELECTOR_STRATEGY")
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or(defaults.selector),
            http: HttpConfig::from_env(env)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Only the addresses of the selected registry are checked.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the selected registry has no usable
    /// address, a breaker setting is zero, or the HTTP settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.registry {
            RegistryKind::Etcd => validate_addrs("ETCD_ADDRS", &self.etcd_addrs)?,
            RegistryKind::Consul => validate_addrs("CONSUL_ADDRS", &self.consul_addrs)?,
            RegistryKind::Static => {
                for addrs in self.static_nodes.values() {
                    validate_addrs("STATIC_NODES", addrs)?;
                }
            }
        }

        if self.breaker.timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "BREAKER_TIMEOUT_MS",
                "must be greater than 0",
            ));
        }
        if self.breaker.max_concurrent_requests == 0 {
            return Err(ConfigError::invalid_value(
                "BREAKER_MAX_CONCURRENT",
                "must be greater than 0",
            ));
        }
        if self.breaker.rolling_window.is_zero() {
            return Err(ConfigError::invalid_value(
                "breaker.rolling_window",
                "must be greater than 0",
            ));
        }
        self.http.validate()
    }

    /// Select the discovery backend.
    #[must_use]
    pub const fn with_registry(mut self, registry: RegistryKind) -> Self {
        self.registry = registry;
        self
    }

    /// Set the etcd addresses.
    #[must_use]
    pub fn with_etcd_addrs<I, S>(mut self, addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.etcd_addrs = addrs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the Consul addresses.
    #[must_use]
    pub fn with_consul_addrs<I, S>(mut self, addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consul_addrs = addrs.into_iter().map(Into::into).collect();
        self
    }

    /// Add a node address for `service` in the static registry.
    #[must_use]
    pub fn with_static_node(mut self, service: impl Into<String>, addr: impl Into<String>) -> Self {
        self.static_nodes
            .entry(service.into())
            .or_default()
            .push(addr.into());
        self
    }

    /// Set the circuit breaker settings.
    #[must_use]
    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Set the selector strategy.
    #[must_use]
    pub const fn with_selector(mut self, selector: SelectorStrategy) -> Self {
        self.selector = selector;
        self
    }

    /// Set the HTTP settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

fn validate_addrs(field: &str, addrs: &[String]) -> Result<(), ConfigError> {
    if addrs.is_empty() {
        return Err(ConfigError::MissingRequired(field.to_string()));
    }
    for addr in addrs {
        parse_address(field, addr)?;
    }
    Ok(())
}

fn parse_static_nodes(entries: &[String]) -> Result<HashMap<String, Vec<String>>, ConfigError> {
    let mut nodes: HashMap<String, Vec<String>> = HashMap::new();
    for entry in entries {
        let (service, addr) = entry
            .split_once('=')
            .map(|(s, a)| (s.trim(), a.trim()))
            .filter(|(s, a)| !s.is_empty() && !a.is_empty())
            .ok_or_else(|| {
                ConfigError::invalid_value("STATIC_NODES", format!("expected service=host:port, got {entry}"))
            })?;
        nodes
            .entry(service.to_string())
            .or_default()
            .push(addr.to_string());
    }
    Ok(nodes)
}
