//! Domain errors - error types for the domain layer
//!
//! Every variant belongs to exactly one category (not found, validation,
//! authorization, conflict, infrastructure). Callers branch on the category
//! helpers rather than on individual variants.

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Conversation not found: {0}")]
    ConversationNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("Referenced {kind} not found: {id}")]
    ReferenceNotFound { kind: &'static str, id: Snowflake },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Group must have between {min} and {max} participants, got {actual}")]
    InvalidGroupSize { min: usize, max: usize, actual: usize },

    #[error("Group is full: max {max} participants")]
    GroupFull { max: usize },

    #[error("Conversation name must not be empty")]
    EmptyName,

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    #[error("Cannot open a private conversation with yourself")]
    SelfConversation,

    #[error("Operation is only allowed on group conversations")]
    NotAGroup,

    #[error("Reply target {0} is not in this conversation")]
    InvalidReply(Snowflake),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Not a participant of this conversation")]
    NotParticipant,

    #[error("Not the sender of this message")]
    NotMessageSender,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Message already deleted")]
    MessageAlreadyDeleted,

    #[error("Private conversation already exists for this pair")]
    PrivateConversationExists,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Media storage error: {0}")]
    StorageError(String),

    #[error("Directory error: {0}")]
    DirectoryError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::ConversationNotFound(_) => "UNKNOWN_CONVERSATION",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::ReferenceNotFound { .. } => "UNKNOWN_REFERENCE",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidGroupSize { .. } => "INVALID_GROUP_SIZE",
            Self::GroupFull { .. } => "GROUP_FULL",
            Self::EmptyName => "EMPTY_NAME",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::SelfConversation => "SELF_CONVERSATION",
            Self::NotAGroup => "NOT_A_GROUP",
            Self::InvalidReply(_) => "INVALID_REPLY",

            // Authorization
            Self::NotParticipant => "NOT_PARTICIPANT",
            Self::NotMessageSender => "NOT_MESSAGE_SENDER",

            // Conflict
            Self::MessageAlreadyDeleted => "MESSAGE_ALREADY_DELETED",
            Self::PrivateConversationExists => "PRIVATE_CONVERSATION_EXISTS",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::DirectoryError(_) => "DIRECTORY_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ConversationNotFound(_)
                | Self::MessageNotFound(_)
                | Self::UserNotFound(_)
                | Self::ReferenceNotFound { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InvalidGroupSize { .. }
                | Self::GroupFull { .. }
                | Self::EmptyName
                | Self::ContentTooLong { .. }
                | Self::SelfConversation
                | Self::NotAGroup
                | Self::InvalidReply(_)
        )
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::NotParticipant | Self::NotMessageSender)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::MessageAlreadyDeleted | Self::PrivateConversationExists
        )
    }
}
