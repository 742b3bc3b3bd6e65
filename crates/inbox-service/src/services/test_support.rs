//! Shared fixture for service tests: in-memory store, strict directory,
//! in-memory media storage

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use inbox_common::auth::JwtService;
use inbox_common::{MemoryDirectory, MemoryMediaStorage};
use inbox_core::traits::{ConversationRepository, MessageRepository};
use inbox_core::{
    Conversation, ForeignDirectory, ForeignKind, ForeignPreview, Message, RepoResult, Snowflake,
    SnowflakeGenerator,
};
use inbox_db::MemoryStore;

use super::context::{ServiceContext, ServiceContextBuilder};

pub(crate) struct Fixture {
    pub ctx: ServiceContext,
    pub store: Arc<MemoryStore>,
    pub media: Arc<MemoryMediaStorage>,
    pub directory: Arc<MemoryDirectory>,
    lookups: Arc<AtomicUsize>,
    users: HashMap<String, Snowflake>,
}

/// Directory that counts every lookup before delegating
struct CountingDirectory {
    inner: Arc<MemoryDirectory>,
    lookups: Arc<AtomicUsize>,
}

#[async_trait]
impl ForeignDirectory for CountingDirectory {
    async fn resolve(&self, kind: ForeignKind, id: Snowflake) -> RepoResult<Option<ForeignPreview>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(kind, id).await
    }
}

impl Fixture {
    /// Id of a user registered by name
    pub fn user(&self, name: &str) -> Snowflake {
        self.users[name]
    }

    /// Stored conversation, if it still exists
    pub async fn conversation(&self, id: Snowflake) -> Option<Conversation> {
        ConversationRepository::find_by_id(self.store.as_ref(), id)
            .await
            .unwrap()
    }

    /// Directory lookups made through the context so far
    pub fn directory_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub async fn message(&self, id: Snowflake) -> Option<Message> {
        MessageRepository::find_by_id(self.store.as_ref(), id)
            .await
            .unwrap()
    }
}

/// Context whose directory knows exactly the given users
pub(crate) fn fixture(names: &[&str]) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let media = Arc::new(MemoryMediaStorage::new());
    let directory = Arc::new(MemoryDirectory::new());
    let lookups = Arc::new(AtomicUsize::new(0));

    let users: HashMap<String, Snowflake> = names
        .iter()
        .zip(100..)
        .map(|(name, id)| ((*name).to_string(), Snowflake::new(id)))
        .collect();
    for (name, id) in &users {
        directory.insert_user(*id, name);
    }

    let ctx = ServiceContextBuilder::new()
        .conversation_repo(store.clone())
        .message_repo(store.clone())
        .directory(Arc::new(CountingDirectory {
            inner: directory.clone(),
            lookups: lookups.clone(),
        }))
        .media(media.clone())
        .jwt_service(Arc::new(JwtService::new("test-secret", 900)))
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(1).unwrap()))
        .build()
        .unwrap();

    Fixture {
        ctx,
        store,
        media,
        directory,
        lookups,
        users,
    }
}
