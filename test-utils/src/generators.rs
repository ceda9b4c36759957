//! Shared proptest generators.

use micro_log::LogLevel;
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Generate service names as registered in discovery.
pub fn service_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{2,20}"
}

/// Generate absolute RPC paths.
pub fn rpc_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_]{1,12}", 1..4).prop_map(|segments| format!("/{}", segments.join("/")))
}

/// Generate process names usable as log file stems.
pub fn process_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}"
}

/// Generate `host:port` node addresses in private ranges.
pub fn node_address_strategy() -> impl Strategy<Value = String> {
    (prop_oneof![Just(10u8), Just(172u8), Just(192u8)], any::<u8>(), any::<u8>(), 1024u16..65535)
        .prop_map(|(a, b, c, port)| format!("{a}.{b}.{c}.1:{port}"))
}

/// Generate flat JSON objects as request or reply bodies.
pub fn json_object_strategy() -> impl Strategy<Value = Map<String, Value>> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,20}".prop_map(Value::String),
    ];
    prop::collection::btree_map("[a-z_]{1,10}", leaf, 0..6).prop_map(|fields| fields.into_iter().collect())
}

/// Generate log levels.
pub fn log_level_strategy() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}
