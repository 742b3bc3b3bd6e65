//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in inbox-core.

mod conversation;
mod error;
mod message;

pub use conversation::PgConversationRepository;
pub use message::PgMessageRepository;
