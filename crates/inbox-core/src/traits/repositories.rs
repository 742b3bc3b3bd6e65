//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Every method that changes a conversation runs
//! as one atomic unit scoped to that conversation: concurrent changes to the
//! same conversation are serialized, changes to different conversations never
//! wait on each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{Conversation, Message};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Conversation Repository
// ============================================================================

/// Cursor for a user's inbox, most recently updated first
#[derive(Debug, Clone, Default)]
pub struct ConversationQuery {
    /// Only conversations updated before this conversation's last update
    pub before: Option<Snowflake>,
    /// Maximum rows returned; callers bound it, stores only floor it at one
    pub limit: i64,
}

/// Change applied to a conversation while it is locked
///
/// The closure receives the current state and may mutate it. The messages it
/// returns are inserted in the same unit of work, and each is also recorded
/// on the conversation (`last_message_id`, unread counters) by the store. An
/// error aborts the whole change.
pub type ConversationChange =
    Box<dyn FnOnce(&mut Conversation) -> RepoResult<Vec<Message>> + Send>;

/// Result of [`ConversationRepository::update`]
#[derive(Debug, Clone)]
pub enum ChangeOutcome {
    /// The change was stored along with the returned messages
    Updated {
        conversation: Conversation,
        messages: Vec<Message>,
    },
    /// The change emptied a group, so the conversation and every message in
    /// it were deleted instead. Holds the last state before deletion.
    Deleted {
        conversation: Conversation,
        purged_messages: u64,
    },
}

impl ChangeOutcome {
    pub fn conversation(&self) -> &Conversation {
        match self {
            Self::Updated { conversation, .. } | Self::Deleted { conversation, .. } => conversation,
        }
    }
}

/// Result of [`ConversationRepository::mark_read`]
#[derive(Debug, Clone)]
pub struct ReadReceipt {
    pub conversation: Conversation,
    /// Messages that moved from sent to read
    pub messages_read: u64,
    pub read_at: DateTime<Utc>,
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Find conversation by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>>;

    /// Find the private conversation for an unordered pair
    async fn find_private(&self, a: Snowflake, b: Snowflake) -> RepoResult<Option<Conversation>>;

    /// List conversations a user participates in, most recently updated first
    async fn find_by_participant(
        &self,
        user_id: Snowflake,
        query: ConversationQuery,
    ) -> RepoResult<Vec<Conversation>>;

    /// Insert a private conversation unless its pair already has one
    ///
    /// Returns the stored conversation and whether it was created by this
    /// call. Losing a race to a concurrent insert is not an error.
    async fn create_private(&self, conversation: &Conversation) -> RepoResult<(Conversation, bool)>;

    /// Insert a group together with its opening messages
    ///
    /// The messages are recorded on the conversation exactly as in
    /// [`update`](Self::update); the stored conversation is returned.
    async fn create_group(
        &self,
        conversation: &Conversation,
        messages: &[Message],
    ) -> RepoResult<Conversation>;

    /// Apply a change to a locked conversation
    ///
    /// When the change leaves a group with no participants, the conversation
    /// and all its messages are deleted in the same unit of work and the
    /// returned messages are discarded.
    async fn update(&self, id: Snowflake, change: ConversationChange) -> RepoResult<ChangeOutcome>;

    /// Reset `user_id`'s unread counter and mark every message not sent by
    /// them as read
    async fn mark_read(&self, id: Snowflake, user_id: Snowflake) -> RepoResult<ReadReceipt>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> RepoResult<()>;
}

// ============================================================================
// Message Repository
// ============================================================================

/// Pagination options for message queries
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    pub limit: i64,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find message by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>>;

    /// Page of messages ordered newest first by `(created_at, id)`
    ///
    /// `before` and `after` are message ids in the same conversation; an
    /// unknown cursor yields an empty page.
    async fn find_by_conversation(
        &self,
        conversation_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>>;

    /// Toggle `user_id`'s reaction atomically with respect to the message
    async fn toggle_reaction(
        &self,
        id: Snowflake,
        user_id: Snowflake,
        emoji: &str,
    ) -> RepoResult<Message>;

    /// Turn the message into a tombstone
    ///
    /// Fails with `MessageAlreadyDeleted` when it already is one.
    async fn tombstone(&self, id: Snowflake) -> RepoResult<Message>;
}
