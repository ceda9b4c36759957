//! Node selection among the instances of a service.

use crate::registry::Node;
use micro_common::ConfigError;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

/// How a node is picked from a resolved service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectorStrategy {
    /// Cycle through nodes, one counter per service
    #[default]
    RoundRobin,
    /// Pick uniformly at random
    Random,
}

impl SelectorStrategy {
    /// Configuration name of the strategy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectorStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" | "rr" => Ok(Self::RoundRobin),
            "random" => Ok(Self::Random),
            other => Err(ConfigError::unknown_variant("selector strategy", other)),
        }
    }
}

/// Picks the node each call goes to.
#[derive(Debug, Default)]
pub struct Selector {
    strategy: SelectorStrategy,
    cursors: Mutex<HashMap<String, usize>>,
}

impl Selector {
    /// Create a selector using `strategy`.
    #[must_use]
    pub fn new(strategy: SelectorStrategy) -> Self {
        Self {
            strategy,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// Strategy in use.
    #[must_use]
    pub const fn strategy(&self) -> SelectorStrategy {
        self.strategy
    }

    /// Choose a node for `service`, or `None` if there are no nodes.
    ///
    /// Round robin keeps one cursor per service name for the selector's
    /// lifetime.
    pub fn select<'a>(&self, service: &str, nodes: &'a [Node]) -> Option<&'a Node> {
        if nodes.is_empty() {
            return None;
        }
        let index = match self.strategy {
            SelectorStrategy::RoundRobin => {
                let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
                let cursor = cursors.entry(service.to_string()).or_insert(0);
                let index = *cursor % nodes.len();
                *cursor = cursor.wrapping_add(1);
                index
            }
            SelectorStrategy::Random => rand::thread_rng().gen_range(0..nodes.len()),
        };
        nodes.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(n: usize) -> Vec<Node> {
        (0..n)
            .map(|i| Node::new(format!("node-{i}"), format!("10.0.0.{i}:8080")))
            .collect()
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("round_robin".parse::<SelectorStrategy>().unwrap(), SelectorStrategy::RoundRobin);
        assert_eq!("RoundRobin".parse::<SelectorStrategy>().unwrap(), SelectorStrategy::RoundRobin);
        assert_eq!("round-robin".parse::<SelectorStrategy>().unwrap(), SelectorStrategy::RoundRobin);
        assert_eq!("random".parse::<SelectorStrategy>().unwrap(), SelectorStrategy::Random);
        assert!(matches!(
            "weighted".parse::<SelectorStrategy>(),
            Err(ConfigError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn test_empty_nodes() {
        let selector = Selector::new(SelectorStrategy::RoundRobin);
        assert!(selector.select("billing", &[]).is_none());
        let selector = Selector::new(SelectorStrategy::Random);
        assert!(selector.select("billing", &[]).is_none());
    }

    #[test]
    fn test_round_robin_cycles() {
        let selector = Selector::new(SelectorStrategy::RoundRobin);
        let nodes = nodes(3);

        let picked: Vec<&str> = (0..6)
            .map(|_| selector.select("billing", &nodes).unwrap().id.as_str())
            .collect();
        assert_eq!(picked, ["node-0", "node-1", "node-2", "node-0", "node-1", "node-2"]);
    }

    #[test]
    fn test_round_robin_per_service() {
        let selector = Selector::new(SelectorStrategy::RoundRobin);
        let nodes = nodes(2);

        assert_eq!(selector.select("billing", &nodes).unwrap().id, "node-0");
        assert_eq!(selector.select("orders", &nodes).unwrap().id, "node-0");
        assert_eq!(selector.select("billing", &nodes).unwrap().id, "node-1");
    }

    #[test]
    fn test_random_stays_in_bounds() {
        let selector = Selector::new(SelectorStrategy::Random);
        let nodes = nodes(4);
        for _ in 0..100 {
            assert!(selector.select("billing", &nodes).is_some());
        }
    }
}
