//! Gateway wire frames and handshake payloads.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Gateway opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Dispatch,
    Heartbeat,
    Identify,
    Resume,
    Reconnect,
    InvalidSession,
    Hello,
    HeartbeatAck,
}

impl Opcode {
    /// Numeric code used on the wire.
    pub const fn code(self) -> u8 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::Resume => 6,
            Self::Reconnect => 7,
            Self::InvalidSession => 9,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtoError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Dispatch),
            1 => Ok(Self::Heartbeat),
            2 => Ok(Self::Identify),
            6 => Ok(Self::Resume),
            7 => Ok(Self::Reconnect),
            9 => Ok(Self::InvalidSession),
            10 => Ok(Self::Hello),
            11 => Ok(Self::HeartbeatAck),
            other => Err(ProtoError::UnknownOpcode(other)),
        }
    }
}

/// Gateway intent bit-flags.
pub mod intents {
    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MEMBERS: u64 = 1 << 1;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;
    pub const DIRECT_MESSAGES: u64 = 1 << 12;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;

    /// Flags the scheduler bot subscribes to.
    pub const DEFAULT: u64 = GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT;
}

/// Name of the dispatch event that completes a handshake.
pub const READY_EVENT: &str = "READY";

/// One gateway frame: `{op, d, s, t}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Raw opcode.
    pub op: u8,
    /// Opcode-specific payload.
    #[serde(default)]
    pub d: serde_json::Value,
    /// Sequence number (dispatch frames only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    /// Event-type name (dispatch frames only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayEvent {
    /// Builds an outbound frame with no sequence or event name.
    pub fn new(op: Opcode, d: serde_json::Value) -> Self {
        Self {
            op: op.code(),
            d,
            s: None,
            t: None,
        }
    }

    /// Heartbeat frame carrying the last seen sequence (`null` before the first dispatch).
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self::new(Opcode::Heartbeat, serde_json::json!(sequence))
    }

    /// Identify frame.
    pub fn identify(identify: &IdentifyData) -> Result<Self, ProtoError> {
        let d = serde_json::to_value(identify)
            .map_err(|e| ProtoError::Serialization(e.to_string()))?;
        Ok(Self::new(Opcode::Identify, d))
    }

    /// Typed opcode, if known.
    pub fn opcode(&self) -> Result<Opcode, ProtoError> {
        Opcode::try_from(self.op)
    }

    /// Parses a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(text).map_err(|e| ProtoError::Serialization(e.to_string()))
    }

    /// Serializes to a text frame.
    pub fn encode(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Serialization(e.to_string()))
    }
}

/// HELLO payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloData {
    /// Heartbeat period in milliseconds.
    pub heartbeat_interval: u64,
}

/// IDENTIFY payload.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentifyData {
    pub token: String,
    pub intents: u64,
    pub properties: IdentifyProperties,
}

impl std::fmt::Debug for IdentifyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifyData")
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("properties", &self.properties)
            .finish()
    }
}

/// Client descriptor sent with IDENTIFY.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    /// Descriptor for this process: running OS plus the client name.
    pub fn for_client(name: &str) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: name.to_string(),
            device: name.to_string(),
        }
    }
}

/// READY dispatch payload (only the fields the client keeps).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyData {
    pub session_id: String,
    #[serde(default)]
    pub user: Option<crate::rest::User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_codes_round_trip_through_try_from() {
        for op in [
            Opcode::Dispatch,
            Opcode::Heartbeat,
            Opcode::Identify,
            Opcode::Resume,
            Opcode::Reconnect,
            Opcode::InvalidSession,
            Opcode::Hello,
            Opcode::HeartbeatAck,
        ] {
            assert_eq!(Opcode::try_from(op.code()).expect("known"), op);
        }
        assert!(matches!(
            Opcode::try_from(3),
            Err(ProtoError::UnknownOpcode(3))
        ));
    }

    #[test]
    fn decode_dispatch_frame_with_sequence_and_name() {
        let frame = GatewayEvent::decode(r#"{"op":0,"d":{"id":"1"},"s":42,"t":"MESSAGE_CREATE"}"#)
            .expect("valid frame");
        assert_eq!(frame.opcode().expect("opcode"), Opcode::Dispatch);
        assert_eq!(frame.s, Some(42));
        assert_eq!(frame.t.as_deref(), Some("MESSAGE_CREATE"));
        assert_eq!(frame.d["id"], "1");
    }

    #[test]
    fn decode_tolerates_null_sequence_and_missing_payload() {
        let frame = GatewayEvent::decode(r#"{"op":11,"s":null,"t":null}"#).expect("ack frame");
        assert_eq!(frame.opcode().expect("opcode"), Opcode::HeartbeatAck);
        assert_eq!(frame.s, None);
        assert!(frame.d.is_null());
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = GatewayEvent::decode("{not json").expect_err("garbage");
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn heartbeat_encodes_null_before_first_sequence() {
        let text = GatewayEvent::heartbeat(None).encode().expect("encode");
        assert_eq!(text, r#"{"op":1,"d":null}"#);

        let text = GatewayEvent::heartbeat(Some(7)).encode().expect("encode");
        assert_eq!(text, r#"{"op":1,"d":7}"#);
    }

    #[test]
    fn identify_debug_output_hides_token() {
        let identify = IdentifyData {
            token: "super-secret".to_string(),
            intents: intents::DEFAULT,
            properties: IdentifyProperties::for_client("cnayp-bot"),
        };
        let debug = format!("{identify:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn default_intents_cover_guild_messages_and_content() {
        assert_eq!(intents::DEFAULT, 1 | (1 << 9) | (1 << 15));
    }
}
