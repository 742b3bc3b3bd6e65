//! Events pushed to connected clients

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Name of a pushed event, sent as the `t` field of a dispatch frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Ready,
    MessageCreate,
    MessageReactionUpdate,
    MessageDelete,
    ConversationCreate,
    ConversationUpdate,
    ConversationMemberRemove,
    ConversationRead,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageReactionUpdate => "MESSAGE_REACTION_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::ConversationCreate => "CONVERSATION_CREATE",
            Self::ConversationUpdate => "CONVERSATION_UPDATE",
            Self::ConversationMemberRemove => "CONVERSATION_MEMBER_REMOVE",
            Self::ConversationRead => "CONVERSATION_READ",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event kind plus its JSON payload
///
/// The payload is shared, so fanning one event out to many connections does
/// not copy it.
#[derive(Debug, Clone)]
pub struct InboxEvent {
    pub kind: EventKind,
    pub data: Arc<Value>,
}

impl InboxEvent {
    /// Serialize `payload` into an event
    ///
    /// Response DTOs always serialize; should one ever fail the event is
    /// still delivered with a `null` payload rather than failing the
    /// operation that produced it.
    pub fn new<T: Serialize>(kind: EventKind, payload: &T) -> Self {
        let data = serde_json::to_value(payload).unwrap_or_else(|e| {
            warn!(event = %kind, error = %e, "Failed to serialize event payload");
            Value::Null
        });
        Self {
            kind,
            data: Arc::new(data),
        }
    }
}
