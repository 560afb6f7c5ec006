use std::collections::HashMap;

use rand::seq::SliceRandom;
use tracing::{debug, trace, warn};

use crate::packet::{Destination, Packet};
use crate::table::MAX_HOP;

/// Outcome of feeding one received packet into [`RoutingState`]. The
/// caller (the I/O-owning `Router`) is responsible for actually performing
/// the indicated I/O — `RoutingState` never touches a socket.
#[derive(Debug)]
pub enum Classification {
    /// `destination == self`: log `msg` locally. No table mutation.
    Deliver { msg: String },
    /// A Hello or Update broadcast was absorbed. `triggered_update` is set
    /// when the caller must immediately re-broadcast (an Update broadcast
    /// that changed the tables — Hellos never trigger one, to avoid storm
    /// amplification at bootstrap).
    Broadcast { triggered_update: bool },
    /// Transit traffic to re-emit, with `hop` already incremented.
    Forward { via_port: u16, packet: Packet },
    Drop(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// `destination == Broadcast` but `data` doesn't parse as a control
    /// payload.
    NotControl,
    /// `hop >= MAX_HOP` on a transit packet.
    HopLimitExceeded,
    /// Transit traffic with no destination route and no endpoints at all
    /// to flood onto.
    NoEndpoints,
}

/// The pure, synchronous distance-vector/route-table state machine for one
/// router. Holds no sockets, spawns no tasks, and measures no time — all
/// of that lives in the `router` crate, which drives this type.
#[derive(Debug)]
pub struct RoutingState {
    self_name: String,
    distance_vector: HashMap<String, u32>,
    route_table: HashMap<String, u16>,
    dirty: bool,
}

impl RoutingState {
    /// Constructs a fresh state with `self -> 0` already present, an
    /// invariant that holds at all times after construction.
    pub fn new(self_name: impl Into<String>) -> Self {
        let self_name = self_name.into();
        let mut distance_vector = HashMap::new();
        distance_vector.insert(self_name.clone(), 0);
        Self {
            self_name,
            distance_vector,
            route_table: HashMap::new(),
            dirty: false,
        }
    }

    pub fn self_name(&self) -> &str {
        &self.self_name
    }

    pub fn distance_vector(&self) -> &HashMap<String, u32> {
        &self.distance_vector
    }

    pub fn route_table(&self) -> &HashMap<String, u16> {
        &self.route_table
    }

    /// Builds the Hello broadcast emitted once per endpoint at startup.
    /// `port_on_link` is the sender's input port on that link, carried in
    /// the payload for diagnostics only.
    pub fn hello_packet(&self, port_on_link: u16) -> Packet {
        self.control_packet(port_on_link, true, "Hello Request")
    }

    /// Builds the periodic/triggered Update broadcast.
    pub fn update_packet(&self, port_on_link: u16) -> Packet {
        self.control_packet(port_on_link, false, "Update Broadcast")
    }

    fn control_packet(&self, port_on_link: u16, hello: bool, msg: &str) -> Packet {
        Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({
                "name": self.self_name,
                "port": port_on_link,
                "Hello": hello as u8,
                "msg": msg,
                "d_vector": self.distance_vector,
            }),
            hop: 1,
        }
    }

    /// Feed one received, already-decoded packet into the state machine.
    ///
    /// `received_via` is the output port of the *local* endpoint the
    /// datagram arrived on — not anything encoded in the packet itself —
    /// since that is what the route table maps destinations to.
    pub fn classify(
        &mut self,
        received_via: u16,
        packet: Packet,
        known_ports: &[u16],
    ) -> Classification {
        if packet.destination.as_name() == Some(self.self_name.as_str()) {
            return Classification::Deliver { msg: packet.msg() };
        }

        if packet.is_broadcast() {
            return self.process_broadcast(received_via, packet);
        }

        self.process_transit(packet, known_ports)
    }

    fn process_broadcast(&mut self, received_via: u16, packet: Packet) -> Classification {
        let control = match packet.control() {
            Ok(c) => c,
            Err(_) => {
                warn!("dropping broadcast with malformed control payload");
                return Classification::Drop(DropReason::NotControl);
            }
        };
        let hop = packet.hop;

        for (name, d) in &control.d_vector {
            let candidate = d.saturating_add(hop);
            let improves = match self.distance_vector.get(name) {
                None => true,
                Some(&current) => candidate < current,
            };
            if improves {
                trace!(%name, candidate, "distance vector entry improved");
                self.distance_vector.insert(name.clone(), candidate);
                self.route_table.insert(name.clone(), received_via);
                self.dirty = true;
            }
        }

        let triggered_update = if !control.is_hello() && self.dirty {
            self.dirty = false;
            true
        } else {
            false
        };

        Classification::Broadcast { triggered_update }
    }

    fn process_transit(&mut self, mut packet: Packet, known_ports: &[u16]) -> Classification {
        if packet.hop >= MAX_HOP {
            debug!(hop = packet.hop, "dropping packet at hop limit");
            return Classification::Drop(DropReason::HopLimitExceeded);
        }

        let dest_name = match packet.destination.as_name() {
            Some(name) => name,
            None => unreachable!("Broadcast destinations are handled above"),
        };

        let via_port = match self.route_table.get(dest_name).copied() {
            Some(port) => Some(port),
            None => known_ports.choose(&mut rand::thread_rng()).copied(),
        };

        match via_port {
            Some(via_port) => {
                packet.hop += 1;
                Classification::Forward { via_port, packet }
            }
            None => Classification::Drop(DropReason::NoEndpoints),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn self_distance_is_always_zero() {
        let state = RoutingState::new("R1");
        assert_eq!(state.distance_vector().get("R1"), Some(&0));
    }

    #[test]
    fn self_destined_packet_is_delivered_without_mutation() {
        let mut state = RoutingState::new("R1");
        let before = state.distance_vector().clone();
        let packet = Packet {
            destination: Destination::named("R1"),
            data: serde_json::json!({"msg": "hi"}),
            hop: 2,
        };
        let out = state.classify(4002, packet, &[4002]);
        assert_matches!(out, Classification::Deliver { msg } if msg == "hi");
        assert_eq!(&before, state.distance_vector());
    }

    #[test]
    fn broadcast_learns_new_destination() {
        let mut state = RoutingState::new("R1");
        let mut d_vector = HashMap::new();
        d_vector.insert("R2".to_string(), 0);
        let packet = Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({
                "name": "R2", "port": 4002, "Hello": 1,
                "msg": "Hello Request", "d_vector": d_vector,
            }),
            hop: 1,
        };
        let out = state.classify(4002, packet, &[4002]);
        assert!(matches!(out, Classification::Broadcast { triggered_update: false }));
        assert_eq!(state.distance_vector().get("R2"), Some(&1));
        assert_eq!(state.route_table().get("R2"), Some(&4002));
    }

    #[test]
    fn hello_never_triggers_update_even_when_dirty() {
        let mut state = RoutingState::new("R1");
        let mut d_vector = HashMap::new();
        d_vector.insert("R2".to_string(), 0);
        let hello = Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({
                "name": "R2", "port": 4002, "Hello": 1,
                "msg": "Hello", "d_vector": d_vector,
            }),
            hop: 1,
        };
        let out = state.classify(4002, hello, &[4002]);
        assert!(matches!(out, Classification::Broadcast { triggered_update: false }));
    }

    #[test]
    fn update_triggers_rebroadcast_only_when_dirty() {
        let mut state = RoutingState::new("R1");
        let mut d_vector = HashMap::new();
        d_vector.insert("R3".to_string(), 0);
        let update = Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({
                "name": "R2", "port": 4002, "Hello": 0,
                "msg": "Update", "d_vector": d_vector,
            }),
            hop: 1,
        };
        let out = state.classify(4002, update.clone(), &[4002]);
        assert!(matches!(out, Classification::Broadcast { triggered_update: true }));

        // Replaying the identical update changes nothing further, so no
        // second trigger (first-write-wins / no-op on ties).
        let out2 = state.classify(4002, update, &[4002]);
        assert!(matches!(out2, Classification::Broadcast { triggered_update: false }));
    }

    #[test]
    fn first_arrival_wins_on_equal_cost() {
        let mut state = RoutingState::new("R1");
        let mut d_vector = HashMap::new();
        d_vector.insert("R3".to_string(), 1);
        let via_a = Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({
                "name": "R2", "port": 4002, "Hello": 1,
                "msg": "Hello", "d_vector": d_vector.clone(),
            }),
            hop: 1,
        };
        state.classify(4002, via_a, &[4002, 4003]);
        assert_eq!(state.route_table().get("R3"), Some(&4002));

        let via_b = Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({
                "name": "RX", "port": 4003, "Hello": 1,
                "msg": "Hello", "d_vector": d_vector,
            }),
            hop: 1,
        };
        state.classify(4003, via_b, &[4002, 4003]);
        // Equal cost (2 via either path): first-discovered route is kept.
        assert_eq!(state.route_table().get("R3"), Some(&4002));
    }

    #[test]
    fn transit_packet_is_dropped_at_hop_limit() {
        let mut state = RoutingState::new("R1");
        let packet = Packet {
            destination: Destination::named("RX"),
            data: serde_json::json!({"msg": "?"}),
            hop: MAX_HOP,
        };
        let out = state.classify(4002, packet, &[4002]);
        assert_matches!(out, Classification::Drop(DropReason::HopLimitExceeded));
    }

    #[test]
    fn transit_packet_floods_unknown_destination() {
        let mut state = RoutingState::new("R1");
        let packet = Packet {
            destination: Destination::named("RX"),
            data: serde_json::json!({"msg": "?"}),
            hop: 0,
        };
        let out = state.classify(4002, packet, &[4002, 4003]);
        match out {
            Classification::Forward { via_port, packet } => {
                assert!(via_port == 4002 || via_port == 4003);
                assert_eq!(packet.hop, 1);
            }
            other => panic!("expected Forward, got {other:?}"),
        }
    }

    #[test]
    fn transit_packet_follows_known_route() {
        let mut state = RoutingState::new("R1");
        state.route_table.insert("R3".to_string(), 4002);
        let packet = Packet {
            destination: Destination::named("R3"),
            data: serde_json::json!({"msg": "hi"}),
            hop: 1,
        };
        let out = state.classify(9999, packet, &[4002, 4003]);
        match out {
            Classification::Forward { via_port, packet } => {
                assert_eq!(via_port, 4002);
                assert_eq!(packet.hop, 2);
            }
            other => panic!("expected Forward, got {other:?}"),
        }
    }

    #[test]
    fn broadcast_advertising_own_name_is_a_noop() {
        let mut state = RoutingState::new("R1");
        let mut d_vector = HashMap::new();
        d_vector.insert("R1".to_string(), 0);
        let packet = Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({
                "name": "R2", "port": 4002, "Hello": 1,
                "msg": "Hello", "d_vector": d_vector,
            }),
            hop: 1,
        };
        state.classify(4002, packet, &[4002]);
        assert_eq!(state.distance_vector().get("R1"), Some(&0));
        assert!(state.route_table().get("R1").is_none());
    }
}
