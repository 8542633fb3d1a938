//! Packet - the typed, attribute-keyed message exchanged with a paired device.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::PacketError;

/// Packet type discriminator.
///
/// Unknown type strings decode to [`PacketType::Other`] so that a peer
/// running a newer protocol revision never breaks decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PacketType {
    /// Sender reports its own battery
    BatteryStatus,
    /// Requester asks the receiver to emit a BatteryStatus
    BatteryRequest,
    /// Sender reports its own lock state
    LockStatus,
    /// State pull and/or lock command
    LockRequest,
    /// Any type this crate does not understand
    Other(String),
}

impl PacketType {
    /// Wire name of this packet type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::BatteryStatus => "kdeconnect.battery",
            Self::BatteryRequest => "kdeconnect.battery.request",
            Self::LockStatus => "kdeconnect.lock",
            Self::LockRequest => "kdeconnect.lock.request",
            Self::Other(name) => name,
        }
    }

    /// True for BatteryStatus and BatteryRequest.
    pub fn is_battery(&self) -> bool {
        matches!(self, Self::BatteryStatus | Self::BatteryRequest)
    }

    /// True for LockStatus and LockRequest.
    pub fn is_lock(&self) -> bool {
        matches!(self, Self::LockStatus | Self::LockRequest)
    }
}

impl From<String> for PacketType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "kdeconnect.battery" => Self::BatteryStatus,
            "kdeconnect.battery.request" => Self::BatteryRequest,
            "kdeconnect.lock" => Self::LockStatus,
            "kdeconnect.lock.request" => Self::LockRequest,
            _ => Self::Other(name),
        }
    }
}

impl From<PacketType> for String {
    fn from(packet_type: PacketType) -> Self {
        match packet_type {
            PacketType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol packet.
///
/// Packets are built once with [`Packet::new`] / [`Packet::with`] and are
/// read-only afterwards. On the wire a packet is a single JSON object
/// terminated by `\n`:
///
/// ```text
/// {"id":1700000000000,"type":"kdeconnect.lock","body":{"isLocked":true}}
/// ```
///
/// The presence of a body key is meaningful on its own (for example
/// `requestLocked` carries `null`), so accessors distinguish "absent" from
/// "present with any value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    id: i64,
    #[serde(rename = "type")]
    packet_type: PacketType,
    #[serde(default)]
    body: Map<String, Value>,
}

impl Packet {
    /// Create an empty packet of the given type.
    pub fn new(packet_type: PacketType) -> Self {
        Self {
            id: now_millis(),
            packet_type,
            body: Map::new(),
        }
    }

    /// Create a packet whose body is the serialized form of `body`.
    ///
    /// `body` must serialize to a JSON object.
    pub fn with_body<T: Serialize>(packet_type: PacketType, body: &T) -> Result<Self, PacketError> {
        match serde_json::to_value(body).map_err(PacketError::Serialization)? {
            Value::Object(map) => Ok(Self {
                id: now_millis(),
                packet_type,
                body: map,
            }),
            other => Err(PacketError::InvalidBody(format!(
                "expected object, got {}",
                other
            ))),
        }
    }

    /// Add an attribute while constructing the packet.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    /// Packet id (sender's millisecond timestamp, informational only).
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Packet type.
    pub fn packet_type(&self) -> &PacketType {
        &self.packet_type
    }

    /// Raw attribute map.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Whether the body contains `key`, whatever its value.
    pub fn has(&self, key: &str) -> bool {
        self.body.contains_key(key)
    }

    /// Decode a single attribute.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, PacketError> {
        let value = self
            .body
            .get(key)
            .ok_or_else(|| PacketError::MissingAttribute(key.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|e| PacketError::InvalidAttribute {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Decode the whole body into a typed struct.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, PacketError> {
        serde_json::from_value(Value::Object(self.body.clone()))
            .map_err(PacketError::Deserialization)
    }

    /// Serialize to a newline-terminated JSON frame.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PacketError> {
        let mut bytes = serde_json::to_vec(self).map_err(PacketError::Serialization)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Deserialize from a JSON frame (trailing newline optional).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        serde_json::from_slice(bytes).map_err(PacketError::Deserialization)
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
