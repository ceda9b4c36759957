//! Service discovery backends.
//!
//! A [`Registry`] turns a service name into the nodes currently serving it.
//! Backends are consumed over their public HTTP APIs and queried on every
//! call, so membership changes are picked up without a watch.

mod consul;
mod etcd;
mod memory;

pub use consul::ConsulRegistry;
pub use etcd::EtcdRegistry;
pub use memory::StaticRegistry;

use crate::config::RegistryKind;
use crate::error::RpcResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Instance id, unique within the service
    pub id: String,
    /// `host:port` the instance listens on
    pub address: String,
    /// Free-form instance metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Node {
    /// Create a node without metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Resolves service names to nodes.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Backend kind, reported in request logs.
    fn kind(&self) -> RegistryKind;

    /// Nodes currently registered for `service`.
    ///
    /// An unknown service resolves to an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RpcError::Discovery`] if no backend address answers.
    async fn resolve(&self, service: &str) -> RpcResult<Vec<Node>>;
}
