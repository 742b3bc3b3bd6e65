//! Path parameter extractors
//!
//! Ids arrive as decimal strings; parsing them here keeps malformed ids a
//! 400 instead of a 404.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use inbox_core::Snowflake;
use serde::de::DeserializeOwned;

use crate::response::ApiError;

/// Path parameters with rejections mapped to [`ApiError`]
#[derive(Debug, Clone)]
pub struct SnowflakePath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for SnowflakePath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(inner) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_path(e.body_text()))?;

        Ok(SnowflakePath(inner))
    }
}

fn parse_id(value: &str, name: &str) -> Result<Snowflake, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::invalid_path(format!("Invalid {name} format")))
}

#[derive(Debug, serde::Deserialize)]
pub struct ConversationIdPath {
    pub conversation_id: String,
}

impl ConversationIdPath {
    pub fn conversation_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.conversation_id, "conversation_id")
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct MessageIdPath {
    pub message_id: String,
}

impl MessageIdPath {
    pub fn message_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.message_id, "message_id")
    }
}

/// Path parameters for reaction toggles
#[derive(Debug, serde::Deserialize)]
pub struct ReactionPath {
    pub message_id: String,
    pub emoji: String,
}

impl ReactionPath {
    pub fn message_id(&self) -> Result<Snowflake, ApiError> {
        parse_id(&self.message_id, "message_id")
    }

    /// The emoji, already percent-decoded by the router
    pub fn emoji(&self) -> &str {
        &self.emoji
    }
}
