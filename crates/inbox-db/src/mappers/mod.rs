//! Entity to model mappers
//!
//! Conversions between domain entities (inbox-core) and database models.
//! - `*_from_rows`: rebuild domain objects from a row and its child rows
//! - `*Insert` structs: prepare entity data for database writes

mod conversation;
mod message;

pub use conversation::{conversation_from_rows, ConversationInsert, RosterColumns};
pub use message::{body_json, message_from_rows, MessageInsert};
