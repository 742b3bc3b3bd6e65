//! Ports to services this subsystem does not own
//!
//! Media storage keeps avatar images; the foreign directory answers whether a
//! product, post or profile exists and how to display it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::repositories::RepoResult;
use crate::entities::{Avatar, ForeignKind};
use crate::value_objects::Snowflake;

/// Read-only display projection of a foreign entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignPreview {
    pub kind: ForeignKind,
    pub id: Snowflake,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[async_trait]
pub trait ForeignDirectory: Send + Sync {
    /// `Ok(None)` when the entity does not exist
    async fn resolve(&self, kind: ForeignKind, id: Snowflake) -> RepoResult<Option<ForeignPreview>>;

    /// Whether a user exists, answered through the profile directory
    async fn user_exists(&self, user_id: Snowflake) -> RepoResult<bool> {
        Ok(self.resolve(ForeignKind::Profile, user_id).await?.is_some())
    }
}

/// Object written to media storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub url: String,
    pub handle: String,
}

impl From<StoredMedia> for Avatar {
    fn from(media: StoredMedia) -> Self {
        Self {
            url: media.url,
            handle: media.handle,
        }
    }
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store binary data and return its locator and deletion handle
    async fn store(&self, data: Vec<u8>, content_type: &str) -> RepoResult<StoredMedia>;

    /// Delete a previously stored object; unknown handles are not an error
    async fn delete(&self, handle: &str) -> RepoResult<()>;
}
