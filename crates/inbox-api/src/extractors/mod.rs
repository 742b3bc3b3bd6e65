//! Axum extractors for request handling
//!
//! Custom extractors for authentication, validation, pagination and ids.

mod auth;
mod pagination;
mod path;
mod validated;

pub use auth::AuthUser;
pub use pagination::{Pagination, PaginationParams};
pub use path::{ConversationIdPath, MessageIdPath, ReactionPath, SnowflakePath};
pub use validated::ValidatedJson;
