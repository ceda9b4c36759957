//! Test fixtures with sample data.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use micro_log::{LogLevel, LoggerConfig};
use micro_rpc::Node;
use serde_json::{Value, json};
use std::path::Path;

/// Sample charge request body.
#[must_use]
pub fn charge_request() -> Value {
    json!({"account": "acc-42", "cents": 1250, "currency": "EUR"})
}

/// Sample charge reply body.
#[must_use]
pub fn charge_reply() -> Value {
    json!({"id": "rcpt-9", "settled": true, "balance": 8750})
}

/// Logger configuration writing debug and above under `dir`.
#[must_use]
pub fn logger_config(dir: &Path, process_name: &str) -> LoggerConfig {
    LoggerConfig::new(dir, process_name).with_level(LogLevel::Debug)
}

/// etcd `/v3/kv/range` reply listing one record per node of `service`.
#[must_use]
pub fn etcd_range_reply(service: &str, nodes: &[Node]) -> Value {
    let kvs: Vec<Value> = nodes
        .iter()
        .map(|node| {
            let record = json!({
                "name": service,
                "version": "latest",
                "metadata": null,
                "endpoints": [],
                "nodes": [{"id": node.id, "address": node.address, "metadata": node.metadata}],
            });
            json!({
                "key": STANDARD.encode(format!("/micro/registry/{service}/{}", node.id)),
                "value": STANDARD.encode(record.to_string()),
            })
        })
        .collect();
    json!({"header": {"revision": "1"}, "count": kvs.len().to_string(), "kvs": kvs})
}

/// Consul `/v1/health/service` reply for `nodes` of `service`.
///
/// Node addresses must be `host:port`.
#[must_use]
pub fn consul_health_reply(service: &str, nodes: &[Node]) -> Value {
    let entries: Vec<Value> = nodes
        .iter()
        .map(|node| {
            let (host, port) = node.address.rsplit_once(':').unwrap_or((node.address.as_str(), "80"));
            json!({
                "Node": {"Node": format!("agent-{}", node.id), "Address": host},
                "Service": {
                    "ID": node.id,
                    "Service": service,
                    "Address": host,
                    "Port": port.parse::<u16>().unwrap_or(80),
                    "Meta": node.metadata,
                },
                "Checks": [],
            })
        })
        .collect();
    Value::Array(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etcd_range_reply_shape() {
        let reply = etcd_range_reply("billing", &[Node::new("b1", "10.0.0.1:8080")]);
        assert_eq!(reply["count"], "1");
        let value = STANDARD.decode(reply["kvs"][0]["value"].as_str().unwrap()).unwrap();
        let record: Value = serde_json::from_slice(&value).unwrap();
        assert_eq!(record["nodes"][0]["address"], "10.0.0.1:8080");
    }

    #[test]
    fn test_consul_health_reply_shape() {
        let reply = consul_health_reply("billing", &[Node::new("b1", "10.0.0.1:8080")]);
        assert_eq!(reply[0]["Service"]["Port"], 8080);
        assert_eq!(reply[0]["Service"]["Address"], "10.0.0.1");
    }
}
