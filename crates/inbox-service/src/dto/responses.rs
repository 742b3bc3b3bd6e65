//! Response DTOs for API endpoints and pushed events
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use inbox_core::{
    Conversation, ConversationKind, DeliveryState, ForeignPreview, Message, MessageBody,
    ReactionMap, ReadReceipt, Snowflake, UnreadCounters,
};
use serde::Serialize;

// ============================================================================
// Conversation Responses
// ============================================================================

/// Conversation as seen by a participant
#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub participants: Vec<Snowflake>,
    pub unread_counts: UnreadCounters,
    pub last_message_id: Option<Snowflake>,
    pub created_by: Snowflake,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationResponse {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            kind: conversation.kind,
            name: conversation.name.clone(),
            avatar_url: conversation.avatar.as_ref().map(|a| a.url.clone()),
            participants: conversation.participants().to_vec(),
            unread_counts: conversation.unread().clone(),
            last_message_id: conversation.last_message_id,
            created_by: conversation.created_by,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

impl From<Conversation> for ConversationResponse {
    fn from(conversation: Conversation) -> Self {
        Self::from(&conversation)
    }
}

/// Result of opening a private conversation
#[derive(Debug, Clone, Serialize)]
pub struct PrivateConversationResult {
    #[serde(flatten)]
    pub conversation: ConversationResponse,
    /// `false` when the pair already had a conversation
    #[serde(skip)]
    pub created: bool,
}

/// Result of leaving a group
#[derive(Debug, Clone, Serialize)]
pub struct LeaveOutcome {
    pub conversation_id: Snowflake,
    /// The requester was the last participant and the group is gone
    pub deleted: bool,
}

/// Read receipt, returned to the reader and pushed to the others
#[derive(Debug, Clone, Serialize)]
pub struct ReadReceiptResponse {
    pub conversation_id: Snowflake,
    pub user_id: Snowflake,
    pub read_at: DateTime<Utc>,
    pub messages_read: u64,
}

impl ReadReceiptResponse {
    pub fn new(receipt: &ReadReceipt, user_id: Snowflake) -> Self {
        Self {
            conversation_id: receipt.conversation.id,
            user_id,
            read_at: receipt.read_at,
            messages_read: receipt.messages_read,
        }
    }
}

/// A participant left or was removed
#[derive(Debug, Clone, Serialize)]
pub struct MemberRemoveEvent {
    pub conversation_id: Snowflake,
    pub user_id: Snowflake,
}

// ============================================================================
// Message Responses
// ============================================================================

/// Message with its typed payload flattened in
///
/// `{"id": "...", "type": "text", "text": "hi", ...}`
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    pub sender_id: Option<Snowflake>,
    #[serde(flatten)]
    pub body: MessageBody,
    pub delivery_state: DeliveryState,
    pub reactions: ReactionMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
    /// Display projection of the referenced product, post or profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<ForeignPreview>,
}

impl MessageResponse {
    pub fn with_preview(mut self, preview: Option<ForeignPreview>) -> Self {
        self.preview = preview;
        self
    }
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            body: message.body.clone(),
            delivery_state: message.delivery,
            reactions: message.reactions.clone(),
            reply_to: message.reply_to,
            created_at: message.created_at,
            preview: None,
        }
    }
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self::from(&message)
    }
}

/// Page of history, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<MessageResponse>,
    pub has_more: bool,
}

/// Current reactions of a message after a toggle
#[derive(Debug, Clone, Serialize)]
pub struct ReactionUpdateResponse {
    pub message_id: Snowflake,
    pub conversation_id: Snowflake,
    pub reactions: ReactionMap,
}

impl From<&Message> for ReactionUpdateResponse {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id,
            conversation_id: message.conversation_id,
            reactions: message.reactions.clone(),
        }
    }
}

/// Deletion notice; carries no content
#[derive(Debug, Clone, Serialize)]
pub struct MessageDeleteEvent {
    pub message_id: Snowflake,
    pub conversation_id: Snowflake,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub storage: String,
    pub online_connections: usize,
}

impl ReadinessResponse {
    pub fn ready(storage_healthy: bool, online_connections: usize) -> Self {
        Self {
            status: if storage_healthy { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                storage: if storage_healthy { "healthy" } else { "unhealthy" }.to_string(),
                online_connections,
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}
