//! Message database models

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

/// Database model for messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: Option<i64>,
    pub kind: String,
    pub body: Json<serde_json::Value>,
    pub delivery_state: String,
    pub reply_to: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl MessageModel {
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.kind == "deleted-tombstone"
    }
}

/// Database model for message_reactions table
#[derive(Debug, Clone, FromRow)]
pub struct ReactionModel {
    pub message_id: i64,
    pub emoji: String,
    pub user_id: i64,
}
