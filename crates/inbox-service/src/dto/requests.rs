//! Request DTOs for API endpoints
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.
//! Ids are accepted as JSON strings or numbers.

use inbox_core::{MessageKind, Snowflake};
use serde::Deserialize;
use validator::Validate;

// ============================================================================
// Conversation Requests
// ============================================================================

/// Open (or find) the private conversation with another user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePrivateRequest {
    pub user_id: Snowflake,
}

/// Create group request
///
/// The creator is implied; `member_ids` lists everyone else.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Too many members"))]
    #[serde(default)]
    pub member_ids: Vec<Snowflake>,
}

/// Rename group request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RenameConversationRequest {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub name: String,
}

/// Add members request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddMembersRequest {
    #[validate(length(min = 1, max = 10, message = "Must add 1-10 users"))]
    pub user_ids: Vec<Snowflake>,
}

// ============================================================================
// Message Requests
// ============================================================================

/// Send message request
///
/// Exactly the field the declared type needs must be present; the service
/// turns this into a typed message body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[serde(rename = "type")]
    pub kind: MessageKind,

    #[validate(length(max = 4000, message = "Message must be at most 4000 characters"))]
    pub text: Option<String>,

    #[validate(length(max = 2048, message = "URL must be at most 2048 characters"))]
    pub url: Option<String>,

    pub product_id: Option<Snowflake>,
    pub post_id: Option<Snowflake>,
    pub profile_id: Option<Snowflake>,

    /// Message being replied to, in the same conversation
    pub reply_to: Option<Snowflake>,
}

impl SendMessageRequest {
    /// Plain text message
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            text: Some(text.into()),
            url: None,
            product_id: None,
            post_id: None,
            profile_id: None,
            reply_to: None,
        }
    }

    pub fn replying_to(mut self, message_id: Snowflake) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}
