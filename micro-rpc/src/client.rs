//! RPC client: discovery, node selection and circuit breaking around JSON
//! POST requests.

use crate::config::{RegistryKind, RpcConfig};
use crate::error::{RpcError, RpcResult};
use crate::registry::{ConsulRegistry, EtcdRegistry, Registry, StaticRegistry};
use crate::selector::Selector;
use micro_common::http::JSON_CONTENT_TYPE;
use micro_common::{BreakerError, CircuitBreakerGroup, build_http_client};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Longest slice of an error response body kept in [`RpcError::Status`].
const MAX_ERROR_BODY: usize = 256;

/// Client invoking services by name.
///
/// Build one per process and share it; circuit state lives in the client,
/// one breaker per `{service}.{path}` command.
pub struct RpcClient {
    registry: Arc<dyn Registry>,
    selector: Selector,
    breakers: CircuitBreakerGroup,
    http: Client,
}

impl RpcClient {
    /// Create a client resolving services through `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Config`] if the configuration is invalid, or
    /// [`RpcError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &RpcConfig, registry: Arc<dyn Registry>) -> RpcResult<Self> {
        config.validate()?;
        let http = build_http_client(&config.http).map_err(|e| RpcError::transport(e.to_string()))?;
        Ok(Self::assemble(config, registry, http))
    }

    /// Create a client with the registry named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Config`] if the configuration is invalid or an
    /// address is malformed, or [`RpcError::Transport`] if the HTTP client
    /// cannot be built.
    pub fn from_config(config: &RpcConfig) -> RpcResult<Self> {
        config.validate()?;
        let http = build_http_client(&config.http).map_err(|e| RpcError::transport(e.to_string()))?;

        let registry: Arc<dyn Registry> = match config.registry {
            RegistryKind::Etcd => Arc::new(EtcdRegistry::new(http.clone(), &config.etcd_addrs)?),
            RegistryKind::Consul => Arc::new(ConsulRegistry::new(http.clone(), &config.consul_addrs)?),
            RegistryKind::Static => Arc::new(StaticRegistry::from_addresses(&config.static_nodes)),
        };
        Ok(Self::assemble(config, registry, http))
    }

    fn assemble(config: &RpcConfig, registry: Arc<dyn Registry>, http: Client) -> Self {
        info!(
            registry = %registry.kind(),
            selector = %config.selector,
            timeout = ?config.breaker.timeout,
            "rpc client ready"
        );
        Self {
            registry,
            selector: Selector::new(config.selector),
            breakers: CircuitBreakerGroup::new(config.breaker.clone()),
            http,
        }
    }

    /// Registry used for discovery.
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// Per-command circuit breakers.
    #[must_use]
    pub const fn breakers(&self) -> &CircuitBreakerGroup {
        &self.breakers
    }

    /// POST `body` as JSON to `path` on an instance of `service` and decode
    /// the JSON reply.
    ///
    /// Failures are logged once at error level with `request_id`.
    ///
    /// `path` also names the circuit breaker, and breakers are kept for the
    /// client's lifetime, so pass a route template rather than a path carrying
    /// ids.
    ///
    /// # Errors
    ///
    /// Returns the [`RpcError`] describing why no decoded reply was produced.
    pub async fn call<Req, Resp>(
        &self,
        request_id: &str,
        service: &str,
        path: &str,
        body: &Req,
    ) -> RpcResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let result = self.invoke(request_id, service, path, body).await;
        if let Err(err) = &result {
            error!(request_id = %request_id, service, path, error = %err, "rpc request failed");
        }
        result
    }

    /// [`RpcClient::call`] with a generic JSON object reply; any failure
    /// yields `None`.
    pub async fn call_json(
        &self,
        request_id: &str,
        service: &str,
        path: &str,
        body: &Value,
    ) -> Option<Map<String, Value>> {
        self.call(request_id, service, path, body).await.ok()
    }

    async fn invoke<Req, Resp>(
        &self,
        request_id: &str,
        service: &str,
        path: &str,
        body: &Req,
    ) -> RpcResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| RpcError::Encode(e.to_string()))?;
        let command = format!("{service}.{path}");
        let breaker = self.breakers.get(&command).await;

        breaker
            .call(|| self.attempt(request_id, service, path, &payload))
            .await
            .map_err(|err| match err {
                BreakerError::Open => RpcError::CircuitOpen(command.clone()),
                BreakerError::MaxConcurrency => RpcError::MaxConcurrency(command.clone()),
                BreakerError::Timeout(timeout) => RpcError::Timeout {
                    command: command.clone(),
                    timeout,
                },
                BreakerError::Inner(err) => err,
            })
    }

    async fn attempt<Resp>(
        &self,
        request_id: &str,
        service: &str,
        path: &str,
        payload: &[u8],
    ) -> RpcResult<Resp>
    where
        Resp: DeserializeOwned,
    {
        info!(
            request_id = %request_id,
            registry = %self.registry.kind(),
            service,
            path,
            req = %String::from_utf8_lossy(payload),
            "rpc request"
        );

        let nodes = self.registry.resolve(service).await?;
        let node = self
            .selector
            .select(service, &nodes)
            .ok_or_else(|| RpcError::NoInstances(service.to_string()))?;
        let url = node_url(&node.address, path);

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|e| RpcError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                url,
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| RpcError::Decode(e.to_string()))
    }
}

/// Cut `body` to at most [`MAX_ERROR_BODY`] bytes on a char boundary.
fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}

/// URL of `path` on a node; bare `host:port` addresses use plain HTTP.
fn node_url(address: &str, path: &str) -> String {
    let base = if address.contains("://") {
        address.trim_end_matches('/').to_string()
    } else {
        format!("http://{address}")
    };
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
