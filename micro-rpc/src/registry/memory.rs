//! In-memory registry for fixed deployments and tests.

use super::{Node, Registry};
use crate::config::RegistryKind;
use crate::error::RpcResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registry backed by a map held in process.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    services: RwLock<HashMap<String, Vec<Node>>>,
}

impl StaticRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from service → addresses pairs.
    ///
    /// Node ids are `{service}-{index}`.
    #[must_use]
    pub fn from_addresses(addresses: &HashMap<String, Vec<String>>) -> Self {
        let services = addresses
            .iter()
            .map(|(service, addrs)| {
                let nodes = addrs
                    .iter()
                    .enumerate()
                    .map(|(i, addr)| Node::new(format!("{service}-{i}"), addr.clone()))
                    .collect();
                (service.clone(), nodes)
            })
            .collect();
        Self {
            services: RwLock::new(services),
        }
    }

    /// Add a node, replacing any node of the same service with the same id.
    pub async fn register(&self, service: &str, node: Node) {
        let mut services = self.services.write().await;
        let nodes = services.entry(service.to_string()).or_default();
        nodes.retain(|n| n.id != node.id);
        nodes.push(node);
    }

    /// Remove a node. Returns whether it was registered.
    pub async fn deregister(&self, service: &str, node_id: &str) -> bool {
        let mut services = self.services.write().await;
        let Some(nodes) = services.get_mut(service) else {
            return false;
        };
        let before = nodes.len();
        nodes.retain(|n| n.id != node_id);
        let removed = nodes.len() != before;
        if nodes.is_empty() {
            services.remove(service);
        }
        removed
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    fn kind(&self) -> RegistryKind {
        RegistryKind::Static
    }

    async fn resolve(&self, service: &str) -> RpcResult<Vec<Node>> {
        Ok(self
            .services
            .read()
            .await
            .get(service)
            .cloned()
            .unwrap_or_default())
    }
}
