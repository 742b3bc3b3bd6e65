//! # inbox-core
//!
//! Domain layer for private and group conversations: entities, value objects,
//! storage ports, and the collaborator ports for media and foreign entities.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    pair_key, Avatar, Conversation, ConversationKind, DeliveryState, ForeignKind, Message,
    MessageBody, MessageKind, ReactionMap, UnreadCounters,
};
pub use error::DomainError;
pub use traits::{
    ChangeOutcome, ConversationChange, ConversationQuery, ConversationRepository,
    ForeignDirectory, ForeignPreview, MediaStorage, MessageQuery, MessageRepository, ReadReceipt,
    RepoResult, StoredMedia,
};
pub use value_objects::{Snowflake, SnowflakeError, SnowflakeGenerator};
