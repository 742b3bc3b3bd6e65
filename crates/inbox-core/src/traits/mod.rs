//! Ports implemented by the infrastructure crates

mod collaborators;
mod repositories;

pub use collaborators::{ForeignDirectory, ForeignPreview, MediaStorage, StoredMedia};
pub use repositories::{
    ChangeOutcome, ConversationChange, ConversationQuery, ConversationRepository, MessageQuery,
    MessageRepository, ReadReceipt, RepoResult,
};
