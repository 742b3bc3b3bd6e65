//! Gateway frame format

use inbox_service::InboxEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{HelloPayload, IdentifyPayload, OpCode};

/// Why an incoming frame could not be read
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unknown op code: {0}")]
    UnknownOpcode(u8),
}

/// Every frame on the socket, in both directions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: OpCode,

    /// Event name (dispatch only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Per-connection sequence number (dispatch only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

/// Incoming frame before the op code is checked
#[derive(Deserialize)]
struct RawFrame {
    op: u8,
    #[serde(default)]
    d: Option<Value>,
}

impl GatewayMessage {
    // === Server frames ===

    /// Op 0 carrying a pushed event
    #[must_use]
    pub fn dispatch(event: &InboxEvent, sequence: u64) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event.kind.as_str().to_string()),
            s: Some(sequence),
            d: Some(event.data.as_ref().clone()),
        }
    }

    #[must_use]
    pub fn hello(payload: &HelloPayload) -> Self {
        Self {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: Some(serde_json::json!({ "heartbeat_interval": payload.heartbeat_interval })),
        }
    }

    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            s: None,
            d: None,
        }
    }

    // === Client frames ===

    /// Parse a client text frame
    ///
    /// Op codes outside the protocol are reported separately from JSON
    /// errors so they can close with their own code.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let op = OpCode::from_u8(raw.op).ok_or(FrameError::UnknownOpcode(raw.op))?;
        Ok(Self {
            op,
            t: None,
            s: None,
            d: raw.d,
        })
    }

    /// Read the Identify payload (op 2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        if self.op != OpCode::Identify {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Read the client's last seen sequence from a heartbeat (op 1)
    ///
    /// The outer `None` means this is not a heartbeat; a null payload gives
    /// `Some(None)`.
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.t, self.s) {
            (Some(t), Some(s)) => write!(f, "GatewayMessage(op={}, t={t}, s={s})", self.op),
            _ => write!(f, "GatewayMessage(op={})", self.op),
        }
    }
}
