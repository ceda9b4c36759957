//! Consul registry, read through the health API.

use super::{Node, Registry};
use crate::config::RegistryKind;
use crate::error::{RpcError, RpcResult};
use async_trait::async_trait;
use micro_common::ConfigError;
use micro_common::config::parse_address;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: CatalogNode,
    service: CatalogService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogNode {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogService {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    address: String,
    port: u16,
    #[serde(default)]
    meta: Option<HashMap<String, String>>,
}

impl From<HealthEntry> for Node {
    fn from(entry: HealthEntry) -> Self {
        let host = if entry.service.address.is_empty() {
            entry.node.address
        } else {
            entry.service.address
        };
        Self {
            id: entry.service.id,
            address: format!("{host}:{}", entry.service.port),
            metadata: entry.service.meta.unwrap_or_default(),
        }
    }
}

/// Registry listing the passing instances of a Consul service.
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    http: Client,
    endpoints: Vec<Url>,
}

impl ConsulRegistry {
    /// Create a registry querying `addrs` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if no address is given or one is malformed.
    pub fn new(http: Client, addrs: &[String]) -> Result<Self, ConfigError> {
        if addrs.is_empty() {
            return Err(ConfigError::MissingRequired("CONSUL_ADDRS".to_string()));
        }
        let endpoints = addrs
            .iter()
            .map(|addr| parse_address("CONSUL_ADDRS", addr))
            .collect::<Result<_, _>>()?;
        Ok(Self { http, endpoints })
    }

    /// Agent endpoints, in query order.
    #[must_use]
    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    async fn health(&self, endpoint: &Url, service: &str) -> Result<Vec<Node>, String> {
        let mut url = endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| format!("{endpoint} cannot carry a path"))?
            .pop_if_empty()
            .extend(["v1", "health", "service", service]);
        url.query_pairs_mut().append_pair("passing", "true");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {status} from {url}"));
        }

        let entries: Vec<HealthEntry> = response.json().await.map_err(|e| e.to_string())?;
        Ok(entries.into_iter().map(Node::from).collect())
    }
}

#[async_trait]
impl Registry for ConsulRegistry {
    fn kind(&self) -> RegistryKind {
        RegistryKind::Consul
    }

    async fn resolve(&self, service: &str) -> RpcResult<Vec<Node>> {
        let mut last_error = String::from("no consul endpoint configured");
        for endpoint in &self.endpoints {
            match self.health(endpoint, service).await {
                Ok(nodes) => {
                    debug!(service, endpoint = %endpoint, nodes = nodes.len(), "resolved via consul");
                    return Ok(nodes);
                }
                Err(error) => {
                    warn!(service, endpoint = %endpoint, error = %error, "consul endpoint failed");
                    last_error = error;
                }
            }
        }
        Err(RpcError::discovery(service, last_error))
    }
}
