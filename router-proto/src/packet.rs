use std::collections::HashMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// The `destination` field of a packet: either a router name or the
/// reserved literal `"Broadcast"` used for control traffic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Broadcast,
    Named(String),
}

impl Destination {
    pub const BROADCAST_LITERAL: &'static str = "Broadcast";

    pub fn named(name: impl Into<String>) -> Self {
        Destination::Named(name.into())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Destination::Named(name) => Some(name),
            Destination::Broadcast => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Broadcast => f.write_str(Self::BROADCAST_LITERAL),
            Destination::Named(name) => f.write_str(name),
        }
    }
}

impl Serialize for Destination {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Destination::Broadcast => serializer.serialize_str(Self::BROADCAST_LITERAL),
            Destination::Named(name) => serializer.serialize_str(name),
        }
    }
}

struct DestinationVisitor;

impl<'de> Visitor<'de> for DestinationVisitor {
    type Value = Destination;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a router name or \"Broadcast\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Destination, E> {
        Ok(if v == Destination::BROADCAST_LITERAL {
            Destination::Broadcast
        } else {
            Destination::Named(v.to_owned())
        })
    }
}

impl<'de> Deserialize<'de> for Destination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_str(DestinationVisitor)
    }
}

/// A packet as carried on the wire: a JSON object with `destination`,
/// `data`, and `hop`. `data` is kept generic since its shape differs
/// between control packets (Hello/Update) and application data packets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    pub destination: Destination,
    pub data: serde_json::Value,
    #[serde(default)]
    pub hop: u32,
}

impl Packet {
    /// Decode a raw UDP payload. A failure here is never fatal to the
    /// caller: the protocol has no NACK, so the only correct response is
    /// to drop and log.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(Error::Malformed)
    }

    pub fn encode(&self) -> Vec<u8> {
        // `Packet`'s fields always serialize cleanly; this would only fail
        // on a non-UTF8 map key, which `Destination`/`serde_json::Value`
        // never produce here.
        serde_json::to_vec(self).expect("Packet always serializes")
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self.destination, Destination::Broadcast)
    }

    /// Interpret `data` as a control payload (only meaningful when
    /// `destination == Broadcast`).
    pub fn control(&self) -> Result<ControlPayload> {
        serde_json::from_value(self.data.clone()).map_err(|_| Error::NotControl)
    }

    /// Best-effort extraction of the human-readable `msg` field, used for
    /// the local-delivery success line.
    pub fn msg(&self) -> String {
        self.data
            .get("msg")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| self.data.to_string())
    }
}

/// The `data` object of a Hello/Update control packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPayload {
    pub name: String,
    /// The sender's input port on the link this was sent over. Preserved
    /// for diagnostics and forward compatibility; nothing on the receive
    /// side currently consumes it, since the receiving endpoint's own
    /// output port is what drives the route table.
    pub port: u16,
    #[serde(rename = "Hello")]
    pub hello: u8,
    pub msg: String,
    pub d_vector: HashMap<String, u32>,
}

impl ControlPayload {
    pub fn is_hello(&self) -> bool {
        self.hello != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_round_trips_broadcast() {
        let p = Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({"msg": "hi"}),
            hop: 1,
        };
        let bytes = p.encode();
        let back = Packet::decode(&bytes).unwrap();
        assert!(back.is_broadcast());
    }

    #[test]
    fn destination_round_trips_named() {
        let p = Packet {
            destination: Destination::named("Router#2"),
            data: serde_json::json!({"msg": "hi"}),
            hop: 0,
        };
        let bytes = p.encode();
        let back = Packet::decode(&bytes).unwrap();
        assert_eq!(back.destination.as_name(), Some("Router#2"));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(Packet::decode(b"not json").is_err());
    }

    #[test]
    fn control_extracts_d_vector() {
        let mut d_vector = HashMap::new();
        d_vector.insert("Router#1".to_string(), 0u32);
        let p = Packet {
            destination: Destination::Broadcast,
            data: serde_json::json!({
                "name": "Router#1",
                "port": 4001,
                "Hello": 1,
                "msg": "Hello Request",
                "d_vector": d_vector,
            }),
            hop: 1,
        };
        let control = p.control().unwrap();
        assert_eq!(control.name, "Router#1");
        assert!(control.is_hello());
        assert_eq!(control.d_vector.get("Router#1"), Some(&0));
    }
}
