//! Foreign-entity directory adapters

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use inbox_core::{DomainError, ForeignDirectory, ForeignKind, ForeignPreview, RepoResult, Snowflake};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

fn collection(kind: ForeignKind) -> &'static str {
    match kind {
        ForeignKind::Product => "products",
        ForeignKind::Post => "posts",
        ForeignKind::Profile => "profiles",
    }
}

/// Body returned by the directory service for one entity
#[derive(Debug, Deserialize)]
struct PreviewBody {
    title: String,
    #[serde(default)]
    image_url: Option<String>,
}

/// Directory service reached over HTTP
///
/// `GET {base}/{products|posts|profiles}/{id}`; 404 means the entity does not
/// exist, any other failure is a `DirectoryError`.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| DomainError::DirectoryError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, kind: ForeignKind, id: Snowflake) -> String {
        format!("{}/{}/{}", self.base_url, collection(kind), id)
    }
}

#[async_trait]
impl ForeignDirectory for HttpDirectory {
    #[instrument(skip(self))]
    async fn resolve(&self, kind: ForeignKind, id: Snowflake) -> RepoResult<Option<ForeignPreview>> {
        let response = self
            .client
            .get(self.url(kind, id))
            .send()
            .await
            .map_err(|e| DomainError::DirectoryError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(kind = kind.as_str(), id = %id, "Foreign entity not found");
                Ok(None)
            }
            status if status.is_success() => {
                let body: PreviewBody = response
                    .json()
                    .await
                    .map_err(|e| DomainError::DirectoryError(e.to_string()))?;
                Ok(Some(ForeignPreview {
                    kind,
                    id,
                    title: body.title,
                    image_url: body.image_url,
                }))
            }
            status => Err(DomainError::DirectoryError(format!(
                "directory returned {status} for {} {id}",
                kind.as_str()
            ))),
        }
    }
}

/// In-process directory
///
/// A strict directory knows only the entries inserted into it. An open
/// directory additionally answers every unknown id with a placeholder, for
/// running without a directory service.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: DashMap<(ForeignKind, Snowflake), ForeignPreview>,
    open: bool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open() -> Self {
        Self {
            entries: DashMap::new(),
            open: true,
        }
    }

    pub fn insert(&self, preview: ForeignPreview) {
        self.entries.insert((preview.kind, preview.id), preview);
    }

    /// Register a user profile by id and display name
    pub fn insert_user(&self, id: Snowflake, name: &str) {
        self.insert(ForeignPreview {
            kind: ForeignKind::Profile,
            id,
            title: name.to_string(),
            image_url: None,
        });
    }

    pub fn remove(&self, kind: ForeignKind, id: Snowflake) {
        self.entries.remove(&(kind, id));
    }
}

#[async_trait]
impl ForeignDirectory for MemoryDirectory {
    async fn resolve(&self, kind: ForeignKind, id: Snowflake) -> RepoResult<Option<ForeignPreview>> {
        if let Some(entry) = self.entries.get(&(kind, id)) {
            return Ok(Some(entry.clone()));
        }
        Ok(self.open.then(|| ForeignPreview {
            kind,
            id,
            title: format!("{} {id}", kind.as_str()),
            image_url: None,
        }))
    }
}
