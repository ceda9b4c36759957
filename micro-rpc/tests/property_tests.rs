//! Property-based tests for micro-rpc.
//!
//! These tests verify universal properties across all inputs using proptest.

use micro_common::CircuitBreakerConfig;
use micro_rpc::{
    Node, RegistryKind, RpcClient, RpcConfig, RpcError, Selector, SelectorStrategy,
    StaticRegistry,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn nodes(n: usize) -> Vec<Node> {
    (0..n)
        .map(|i| Node::new(format!("n{i}"), format!("10.0.0.{i}:8080")))
        .collect()
}

// **Property 1: Round Robin Fairness**
// *For any* node count and number of rounds, round robin hands every node the
// same number of calls.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_round_robin_is_fair(count in 1usize..10, rounds in 1usize..20, service in "[a-z]{3,10}") {
        let selector = Selector::new(SelectorStrategy::RoundRobin);
        let nodes = nodes(count);
        let mut hits: HashMap<String, usize> = HashMap::new();

        for _ in 0..count * rounds {
            let node = selector.select(&service, &nodes).unwrap();
            *hits.entry(node.id.clone()).or_default() += 1;
        }

        prop_assert_eq!(hits.len(), count);
        prop_assert!(hits.values().all(|n| *n == rounds));
    }

    #[test]
    fn prop_random_selects_member(count in 1usize..10) {
        let selector = Selector::new(SelectorStrategy::Random);
        let nodes = nodes(count);
        let node = selector.select("svc", &nodes).unwrap();
        prop_assert!(nodes.contains(node));
    }
}

// **Property 2: Registry Selector Parsing**
// *For any* casing of a known backend name, parsing yields that backend; any
// other name is a configuration error.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_registry_kind_case_insensitive(
        kind in prop_oneof![Just(RegistryKind::Etcd), Just(RegistryKind::Consul), Just(RegistryKind::Static)],
        upper in prop::collection::vec(any::<bool>(), 6),
    ) {
        let name: String = kind
            .as_str()
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
            .collect();
        prop_assert_eq!(name.parse::<RegistryKind>().unwrap(), kind);
    }

    #[test]
    fn prop_unknown_registry_rejected(name in "[a-z]{3,12}") {
        prop_assume!(!matches!(name.as_str(), "etcd" | "consul" | "static" | "memory"));
        prop_assert!(name.parse::<RegistryKind>().is_err());
    }
}

// **Property 3: No Instances Is Reported, Not Sent**
// *For any* service missing from the registry, a call fails with
// NoInstances and the generic form yields None.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_unknown_service_yields_none(service in "[a-z]{3,12}", path in "/[a-z]{1,10}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let config = RpcConfig::default()
                .with_registry(RegistryKind::Static)
                .with_breaker(CircuitBreakerConfig::default().with_volume_threshold(1000));
            let client = RpcClient::new(&config, Arc::new(StaticRegistry::new())).unwrap();

            let err = client
                .call::<_, serde_json::Value>("req", &service, &path, &json!({}))
                .await
                .unwrap_err();
            prop_assert!(matches!(err, RpcError::NoInstances(_)));
            let body = json!({});
            let reply = client.call_json("req", &service, &path, &body).await;
            prop_assert!(reply.is_none());
            Ok(())
        })?;
    }
}
