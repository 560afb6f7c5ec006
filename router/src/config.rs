use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One (input, output) UDP port pair: a single bidirectional link to a
/// neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortPair {
    pub input: u16,
    pub output: u16,
}

/// Configuration for a single router instance, independent of how it was
/// obtained (topology file, CLI flags, or built by hand in a test).
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub name: String,
    pub update_time: Duration,
    pub ports: Vec<PortPair>,
}

impl RouterConfig {
    pub fn new(name: impl Into<String>, update_time: Duration, ports: Vec<PortPair>) -> Self {
        Self {
            name: name.into(),
            update_time,
            ports,
        }
    }
}

/// One entry of the topology file's `"routers"` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSpec {
    pub name: String,
    pub ports: Vec<PortPair>,
}

/// The topology file itself: `{"routers": [...]}`. `update_time` is not
/// part of the wire format — the harness applies one common value to every
/// router it builds — so it is supplied separately by the caller (CLI
/// flag or test fixture), not deserialized here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyDocument {
    pub routers: Vec<RouterSpec>,
}
