//! etcd v3 registry, read through the JSON gateway.
//!
//! Services register one key per node under `/micro/registry/{service}/`;
//! each value is a service record whose `nodes` list holds that node.

use super::{Node, Registry};
use crate::config::RegistryKind;
use crate::error::{RpcError, RpcResult};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use micro_common::ConfigError;
use micro_common::config::{address_base, parse_address};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

const REGISTRY_PREFIX: &str = "/micro/registry/";

#[derive(Debug, Serialize)]
struct RangeRequest {
    key: String,
    range_end: String,
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    #[serde(default)]
    nodes: Option<Vec<RecordNode>>,
}

#[derive(Debug, Deserialize)]
struct RecordNode {
    id: String,
    address: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

impl From<RecordNode> for Node {
    fn from(node: RecordNode) -> Self {
        // Older records carry the port separately from the host.
        let address = if node.port != 0 && !node.address.contains(':') {
            format!("{}:{}", node.address, node.port)
        } else {
            node.address
        };
        Self {
            id: node.id,
            address,
            metadata: node.metadata.unwrap_or_default(),
        }
    }
}

/// Key prefix holding the nodes of `service`.
fn service_prefix(service: &str) -> String {
    format!("{REGISTRY_PREFIX}{}/", service.replace('/', "-"))
}

/// End of the key range covering `prefix`, which ends in `/`.
fn prefix_end(prefix: &str) -> String {
    format!("{}0", prefix.trim_end_matches('/'))
}

/// Registry reading go-micro service records from etcd.
#[derive(Debug, Clone)]
pub struct EtcdRegistry {
    http: Client,
    endpoints: Vec<Url>,
}

impl EtcdRegistry {
    /// Create a registry querying `addrs` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if no address is given or one is malformed.
    pub fn new(http: Client, addrs: &[String]) -> Result<Self, ConfigError> {
        if addrs.is_empty() {
            return Err(ConfigError::MissingRequired("ETCD_ADDRS".to_string()));
        }
        let endpoints = addrs
            .iter()
            .map(|addr| parse_address("ETCD_ADDRS", addr))
            .collect::<Result<_, _>>()?;
        Ok(Self { http, endpoints })
    }

    /// Gateway endpoints, in query order.
    #[must_use]
    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    async fn range(&self, endpoint: &Url, service: &str) -> Result<Vec<Node>, String> {
        let url = format!("{}/v3/kv/range", address_base(endpoint));
        let prefix = service_prefix(service);
        let request = RangeRequest {
            key: STANDARD.encode(&prefix),
            range_end: STANDARD.encode(prefix_end(&prefix)),
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {status} from {url}"));
        }

        let range: RangeResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(range.kvs.into_iter().flat_map(decode_record).collect())
    }
}

/// Nodes of one stored record; undecodable records are skipped.
fn decode_record(kv: KeyValue) -> Vec<Node> {
    let record = STANDARD
        .decode(kv.value.as_bytes())
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice::<ServiceRecord>(&bytes).map_err(|e| e.to_string()));

    match record {
        Ok(record) => record
            .nodes
            .unwrap_or_default()
            .into_iter()
            .map(Node::from)
            .collect(),
        Err(error) => {
            let key = STANDARD
                .decode(kv.key.as_bytes())
                .map(|k| String::from_utf8_lossy(&k).into_owned())
                .unwrap_or(kv.key);
            warn!(key = %key, error = %error, "skipping undecodable registry record");
            Vec::new()
        }
    }
}

#[async_trait]
impl Registry for EtcdRegistry {
    fn kind(&self) -> RegistryKind {
        RegistryKind::Etcd
    }

    async fn resolve(&self, service: &str) -> RpcResult<Vec<Node>> {
        let mut last_error = String::from("no etcd endpoint configured");
        for endpoint in &self.endpoints {
            match self.range(endpoint, service).await {
                Ok(nodes) => {
                    debug!(service, endpoint = %endpoint, nodes = nodes.len(), "resolved via etcd");
                    return Ok(nodes);
                }
                Err(error) => {
                    warn!(service, endpoint = %endpoint, error = %error, "etcd endpoint failed");
                    last_error = error;
                }
            }
        }
        Err(RpcError::discovery(service, last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(service: &str, nodes: &serde_json::Value) -> String {
        let value = json!({
            "name": service,
            "version": "latest",
            "metadata": null,
            "endpoints": [],
            "nodes": nodes,
        });
        STANDARD.encode(value.to_string())
    }

    fn range_body(service: &str) -> serde_json::Value {
        let prefix = service_prefix(service);
        json!({
            "key": STANDARD.encode(&prefix),
            "range_end": STANDARD.encode(prefix_end(&prefix)),
        })
    }

    #[test]
    fn test_prefix_range() {
        assert_eq!(service_prefix("billing"), "/micro/registry/billing/");
        assert_eq!(service_prefix("go.micro/api"), "/micro/registry/go.micro-api/");
        assert_eq!(prefix_end("/micro/registry/billing/"), "/micro/registry/billing0");
    }

    #[test]
    fn test_new_requires_addresses() {
        let http = Client::new();
        assert!(matches!(
            EtcdRegistry::new(http.clone(), &[]),
            Err(ConfigError::MissingRequired(_))
        ));
        assert!(matches!(
            EtcdRegistry::new(http.clone(), &["http://".to_string()]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        let registry = EtcdRegistry::new(http, &["127.0.0.1:2379".to_string()]).unwrap();
        assert_eq!(registry.endpoints()[0].as_str(), "http://127.0.0.1:2379/");
    }

    #[test]
    fn test_legacy_port_joined() {
        let node = Node::from(RecordNode {
            id: "n1".to_string(),
            address: "10.0.0.1".to_string(),
            port: 9090,
            metadata: None,
        });
        assert_eq!(node.address, "10.0.0.1:9090");
    }

    #[tokio::test]
    async fn test_resolve_nodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .and(body_json(range_body("billing")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "header": {"revision": "7"},
                "kvs": [
                    {"key": STANDARD.encode("/micro/registry/billing/b1"),
                     "value": record("billing", &json!([{"id": "b1", "address": "10.0.0.1:8080", "metadata": {"zone": "a"}}]))},
                    {"key": STANDARD.encode("/micro/registry/billing/b2"),
                     "value": record("billing", &json!([{"id": "b2", "address": "10.0.0.2:8080"}]))},
                    {"key": STANDARD.encode("/micro/registry/billing/bad"), "value": STANDARD.encode("not json")},
                ],
                "count": "3",
            })))
            .mount(&server)
            .await;

        let registry = EtcdRegistry::new(Client::new(), &[server.uri()]).unwrap();
        let nodes = registry.resolve("billing").await.unwrap();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].address, "10.0.0.1:8080");
        assert_eq!(nodes[0].metadata.get("zone").map(String::as_str), Some("a"));
        assert_eq!(nodes[1].id, "b2");
    }

    #[tokio::test]
    async fn test_resolve_unknown_service_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"header": {}})))
            .mount(&server)
            .await;

        let registry = EtcdRegistry::new(Client::new(), &[server.uri()]).unwrap();
        assert!(registry.resolve("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_next_endpoint() {
        let broken = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&broken)
            .await;

        let healthy = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kvs": [{"key": "", "value": record("billing", &json!([{"id": "b1", "address": "10.0.0.1:8080"}]))}],
            })))
            .expect(1)
            .mount(&healthy)
            .await;

        let registry = EtcdRegistry::new(Client::new(), &[broken.uri(), healthy.uri()]).unwrap();
        let nodes = registry.resolve("billing").await.unwrap();
        assert_eq!(nodes, vec![Node::new("b1", "10.0.0.1:8080")]);
    }

    #[tokio::test]
    async fn test_all_endpoints_down() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let registry = EtcdRegistry::new(Client::new(), &[server.uri()]).unwrap();
        let err = registry.resolve("billing").await.unwrap_err();
        assert!(matches!(err, RpcError::Discovery { ref service, .. } if service == "billing"));
    }
}
