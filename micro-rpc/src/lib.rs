//! Discovery-backed JSON RPC over HTTP.
//!
//! [`RpcClient`] resolves a service through a [`Registry`] (etcd, Consul or
//! a static map), picks a node with a [`Selector`], and POSTs a JSON body to
//! `http://{node}{path}` under a circuit breaker keyed by
//! `{service}.{path}`.
//!
//! ```no_run
//! use micro_rpc::{RpcClient, RpcConfig};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), micro_rpc::RpcError> {
//! let client = RpcClient::from_config(&RpcConfig::default())?;
//! let reply = client
//!     .call_json("req-1", "billing", "/v1/charge", &json!({"cents": 250}))
//!     .await;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod registry;
pub mod selector;

pub use client::RpcClient;
pub use config::{RegistryKind, RpcConfig};
pub use error::{RpcError, RpcResult};
pub use registry::{ConsulRegistry, EtcdRegistry, Node, Registry, StaticRegistry};
pub use selector::{Selector, SelectorStrategy};
