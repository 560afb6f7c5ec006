//! The simulated distance-vector routing daemon: the routing core that
//! ties [`router_proto`]'s pure state machine to [`router_net`]'s UDP link
//! endpoints, plus the thin topology harness built on top of it.

mod config;
mod error;
mod router;
mod topology;

pub use config::{PortPair, RouterConfig, RouterSpec, TopologyDocument};
pub use error::{Error, Result};
pub use router::Router;
pub use topology::Topology;

pub use router_proto::MAX_HOP;
