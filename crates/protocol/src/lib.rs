//! Gateway wire protocol definitions.
//!
//! All gateway traffic is JSON text frames over a WebSocket:
//!
//! - inbound: `{ op, d, s, t }`, see [`GatewayFrame`]
//! - outbound: `{ op, d }`, see [`OutboundFrame`]
//!
//! The second half of this crate names the channels of the host/UI bridge.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
/// Delay before reconnecting after the socket closed.
pub const RECONNECT_DELAY_MS: u64 = 2_000;
/// Delay before reconnecting after an INVALID_SESSION frame.
pub const INVALID_SESSION_DELAY_MS: u64 = 2_500;

// ── Opcodes ──────────────────────────────────────────────────────────────────

pub mod opcodes {
    pub const DISPATCH: u64 = 0;
    pub const HEARTBEAT: u64 = 1;
    pub const IDENTIFY: u64 = 2;
    pub const RECONNECT: u64 = 7;
    pub const INVALID_SESSION: u64 = 9;
    pub const HELLO: u64 = 10;
    pub const HEARTBEAT_ACK: u64 = 11;
}

/// Typed view of a frame's `op` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Dispatch,
    Heartbeat,
    Identify,
    Reconnect,
    InvalidSession,
    Hello,
    HeartbeatAck,
    Other(u64),
}

impl From<u64> for Opcode {
    fn from(op: u64) -> Self {
        match op {
            opcodes::DISPATCH => Self::Dispatch,
            opcodes::HEARTBEAT => Self::Heartbeat,
            opcodes::IDENTIFY => Self::Identify,
            opcodes::RECONNECT => Self::Reconnect,
            opcodes::INVALID_SESSION => Self::InvalidSession,
            opcodes::HELLO => Self::Hello,
            opcodes::HEARTBEAT_ACK => Self::HeartbeatAck,
            other => Self::Other(other),
        }
    }
}

// ── Dispatch event names ─────────────────────────────────────────────────────

pub mod dispatch {
    pub const READY: &str = "READY";
    pub const GUILD_CREATE: &str = "GUILD_CREATE";
    pub const GUILD_UPDATE: &str = "GUILD_UPDATE";
    pub const GUILD_DELETE: &str = "GUILD_DELETE";
    pub const CHANNEL_CREATE: &str = "CHANNEL_CREATE";
    pub const CHANNEL_UPDATE: &str = "CHANNEL_UPDATE";
    pub const CHANNEL_DELETE: &str = "CHANNEL_DELETE";
    pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
    pub const MESSAGE_UPDATE: &str = "MESSAGE_UPDATE";
    pub const MESSAGE_DELETE: &str = "MESSAGE_DELETE";
    pub const RELATIONSHIP_ADD: &str = "RELATIONSHIP_ADD";
    pub const RELATIONSHIP_REMOVE: &str = "RELATIONSHIP_REMOVE";
    pub const USER_UPDATE: &str = "USER_UPDATE";
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("frame op {op} has an invalid payload: {reason}")]
    InvalidPayload { op: u64, reason: String },
}

// ── Inbound frames ───────────────────────────────────────────────────────────

/// One decoded inbound gateway frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayFrame {
    pub op: u64,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayFrame {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn opcode(&self) -> Opcode {
        Opcode::from(self.op)
    }

    /// Dispatch event name (`t`), when present.
    pub fn event_name(&self) -> Option<&str> {
        self.t.as_deref()
    }

    pub fn is_dispatch_of(&self, name: &str) -> bool {
        self.opcode() == Opcode::Dispatch && self.event_name() == Some(name)
    }

    /// Build a dispatch frame. Used by tests and by fake transports.
    pub fn dispatch(name: impl Into<String>, seq: u64, d: Value) -> Self {
        Self {
            op: opcodes::DISPATCH,
            d,
            s: Some(seq),
            t: Some(name.into()),
        }
    }

    /// Parse the `d` field of a HELLO frame.
    pub fn hello(&self) -> Result<Hello, ProtocolError> {
        serde_json::from_value(self.d.clone()).map_err(|e| ProtocolError::InvalidPayload {
            op: self.op,
            reason: e.to_string(),
        })
    }

    /// INVALID_SESSION carries a bare boolean; anything but `true` means the
    /// session cannot be resumed.
    pub fn resumable(&self) -> bool {
        self.d.as_bool().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

// ── Outbound frames ──────────────────────────────────────────────────────────

/// Client → gateway frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundFrame<T> {
    pub op: u64,
    pub d: T,
}

/// `op 1`: heartbeat carrying the last-seen sequence (or null).
pub fn heartbeat(seq: Option<u64>) -> OutboundFrame<Option<u64>> {
    OutboundFrame {
        op: opcodes::HEARTBEAT,
        d: seq,
    }
}

/// `op 2`: identify with the bearer credential and client metadata.
pub fn identify(token: impl Into<String>, properties: IdentifyProperties) -> OutboundFrame<Identify> {
    OutboundFrame {
        op: opcodes::IDENTIFY,
        d: Identify {
            token: token.into(),
            properties,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identify {
    pub token: String,
    pub properties: IdentifyProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

// ── Bridge channel ───────────────────────────────────────────────────────────

/// Names of the host/UI bridge channels.
pub mod channels {
    /// host → UI: a decoded gateway frame.
    pub const GATEWAY_MESSAGE: &str = "discord-gateway-message";
    /// host → UI: heartbeat round-trip latency.
    pub const GATEWAY_PING: &str = "discord-gateway-ping";
    /// UI → host: credential extracted from the login page.
    pub const TOKEN_FOUND: &str = "token-found";
    /// UI → host: forwarded log line.
    pub const LOG: &str = "log";
    /// UI → host request/response: force a gateway reconnect.
    pub const GATEWAY_RECONNECT: &str = "gateway:reconnect";
}

/// Payload of [`channels::GATEWAY_PING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    #[serde(rename = "pingMs")]
    pub ping_ms: u64,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_hello() {
        let frame =
            GatewayFrame::decode(r#"{"op":10,"d":{"heartbeat_interval":41250},"s":null,"t":null}"#)
                .unwrap();
        assert_eq!(frame.opcode(), Opcode::Hello);
        assert_eq!(frame.hello().unwrap().heartbeat_interval, 41_250);
        assert_eq!(frame.s, None);
    }

    #[test]
    fn missing_d_defaults_to_null() {
        let frame = GatewayFrame::decode(r#"{"op":11}"#).unwrap();
        assert_eq!(frame.opcode(), Opcode::HeartbeatAck);
        assert!(frame.d.is_null());
    }

    #[test]
    fn rejects_garbage() {
        assert!(GatewayFrame::decode("not json").is_err());
        assert!(GatewayFrame::decode(r#"{"d":1}"#).is_err());
    }

    #[test]
    fn invalid_session_resumable_flag() {
        let mut frame = GatewayFrame::decode(r#"{"op":9,"d":true}"#).unwrap();
        assert!(frame.resumable());
        frame.d = json!(false);
        assert!(!frame.resumable());
        frame.d = Value::Null;
        assert!(!frame.resumable());
    }

    #[test]
    fn outbound_shapes() {
        assert_eq!(
            serde_json::to_value(heartbeat(Some(42))).unwrap(),
            json!({"op": 1, "d": 42})
        );
        assert_eq!(
            serde_json::to_value(heartbeat(None)).unwrap(),
            json!({"op": 1, "d": null})
        );
        let props = IdentifyProperties {
            os: "linux".into(),
            browser: "Breadcord".into(),
            device: "Breadcord".into(),
        };
        assert_eq!(
            serde_json::to_value(identify("tok", props)).unwrap(),
            json!({"op": 2, "d": {"token": "tok", "properties": {
                "os": "linux", "browser": "Breadcord", "device": "Breadcord"
            }}})
        );
    }

    #[test]
    fn ping_uses_camel_case() {
        assert_eq!(
            serde_json::to_value(Ping { ping_ms: 12 }).unwrap(),
            json!({"pingMs": 12})
        );
    }

    #[test]
    fn unknown_opcode_is_other() {
        assert_eq!(Opcode::from(42), Opcode::Other(42));
        let frame = GatewayFrame::dispatch("READY", 1, json!({}));
        assert!(frame.is_dispatch_of(dispatch::READY));
    }
}
