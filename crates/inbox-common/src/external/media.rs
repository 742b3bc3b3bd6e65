//! Media storage adapters for conversation avatars

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use inbox_core::{DomainError, MediaStorage, RepoResult, StoredMedia};
use tracing::{debug, instrument};
use uuid::Uuid;

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Handles are bare file names; anything that could escape the root is refused
fn is_safe_handle(handle: &str) -> bool {
    !handle.is_empty()
        && !handle.starts_with('.')
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// Files under a local directory served from `public_url`
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl AsRef<Path>, public_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn store(&self, data: Vec<u8>, content_type: &str) -> RepoResult<StoredMedia> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DomainError::StorageError(e.to_string()))?;

        let name = format!("{}.{}", Uuid::new_v4(), extension_for(content_type));
        tokio::fs::write(self.root.join(&name), data)
            .await
            .map_err(|e| DomainError::StorageError(e.to_string()))?;

        debug!(handle = %name, "Stored media object");
        Ok(StoredMedia {
            url: format!("{}/{}", self.public_url, name),
            handle: name,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, handle: &str) -> RepoResult<()> {
        if !is_safe_handle(handle) {
            return Err(DomainError::StorageError(format!("invalid media handle '{handle}'")));
        }

        match tokio::fs::remove_file(self.root.join(handle)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::StorageError(e.to_string())),
        }
    }
}

/// Objects kept in process memory
#[derive(Debug, Default)]
pub struct MemoryMediaStorage {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.objects.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl MediaStorage for MemoryMediaStorage {
    async fn store(&self, data: Vec<u8>, content_type: &str) -> RepoResult<StoredMedia> {
        let handle = format!("{}.{}", Uuid::new_v4(), extension_for(content_type));
        self.objects.insert(handle.clone(), data);
        Ok(StoredMedia {
            url: format!("memory://{handle}"),
            handle,
        })
    }

    async fn delete(&self, handle: &str) -> RepoResult<()> {
        self.objects.remove(handle);
        Ok(())
    }
}
