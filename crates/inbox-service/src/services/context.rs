//! Service context - dependency container for services
//!
//! Holds the stores, the external collaborators, and the real-time plumbing
//! every service needs.

use std::sync::Arc;

use inbox_common::auth::JwtService;
use inbox_core::traits::{ConversationRepository, ForeignDirectory, MediaStorage, MessageRepository};
use inbox_core::{Snowflake, SnowflakeGenerator};
use serde::Serialize;
use tracing::debug;

use super::error::{ServiceError, ServiceResult};
use crate::realtime::{DeliveryRouter, EventKind, InboxEvent, PresenceRegistry};

/// Default cap on avatar uploads
pub const DEFAULT_MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Service context containing all dependencies
///
/// Cheap to clone; everything behind it is shared.
#[derive(Clone)]
pub struct ServiceContext {
    // Stores
    conversation_repo: Arc<dyn ConversationRepository>,
    message_repo: Arc<dyn MessageRepository>,

    // Collaborators
    directory: Arc<dyn ForeignDirectory>,
    media: Arc<dyn MediaStorage>,

    // Real-time
    presence: Arc<PresenceRegistry>,
    router: DeliveryRouter,

    jwt_service: Arc<JwtService>,
    snowflake_generator: Arc<SnowflakeGenerator>,
    max_avatar_bytes: usize,
}

impl ServiceContext {
    // === Stores ===

    pub fn conversation_repo(&self) -> &dyn ConversationRepository {
        self.conversation_repo.as_ref()
    }

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    // === Collaborators ===

    /// Foreign-entity and user directory
    pub fn directory(&self) -> &dyn ForeignDirectory {
        self.directory.as_ref()
    }

    pub fn media(&self) -> &dyn MediaStorage {
        self.media.as_ref()
    }

    // === Real-time ===

    /// Shared presence registry, also handed to the gateway
    pub fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    pub fn router(&self) -> &DeliveryRouter {
        &self.router
    }

    /// Push an event to the reachable participants, skipping `exclude`
    pub(crate) fn publish<T: Serialize>(
        &self,
        participants: &[Snowflake],
        kind: EventKind,
        payload: &T,
        exclude: Option<Snowflake>,
    ) -> usize {
        let event = InboxEvent::new(kind, payload);
        let reached = self.router.push_to_participants(participants, &event, exclude);
        debug!(event = %kind, recipients = participants.len(), reached, "Event pushed");
        reached
    }

    // === Misc ===

    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }

    /// Shared generator, for id allocation inside storage closures
    pub fn snowflake_generator(&self) -> &Arc<SnowflakeGenerator> {
        &self.snowflake_generator
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }

    pub fn max_avatar_bytes(&self) -> usize {
        self.max_avatar_bytes
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("collaborators", &"...")
            .field("online", &self.presence.online_count())
            .field("max_avatar_bytes", &self.max_avatar_bytes)
            .finish()
    }
}

/// Builder for creating ServiceContext
///
/// Stores, collaborators and the JWT service are required; presence and the
/// id generator fall back to fresh instances.
#[derive(Default)]
pub struct ServiceContextBuilder {
    conversation_repo: Option<Arc<dyn ConversationRepository>>,
    message_repo: Option<Arc<dyn MessageRepository>>,
    directory: Option<Arc<dyn ForeignDirectory>>,
    media: Option<Arc<dyn MediaStorage>>,
    presence: Option<Arc<PresenceRegistry>>,
    jwt_service: Option<Arc<JwtService>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    max_avatar_bytes: Option<usize>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_repo(mut self, repo: Arc<dyn ConversationRepository>) -> Self {
        self.conversation_repo = Some(repo);
        self
    }

    pub fn message_repo(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.message_repo = Some(repo);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn ForeignDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn media(mut self, media: Arc<dyn MediaStorage>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn presence(mut self, presence: Arc<PresenceRegistry>) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn max_avatar_bytes(mut self, bytes: usize) -> Self {
        self.max_avatar_bytes = Some(bytes);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let presence = self.presence.unwrap_or_default();
        let snowflake_generator = match self.snowflake_generator {
            Some(generator) => generator,
            None => Arc::new(
                SnowflakeGenerator::new(0).map_err(|e| ServiceError::internal(e.to_string()))?,
            ),
        };

        Ok(ServiceContext {
            conversation_repo: self
                .conversation_repo
                .ok_or_else(|| ServiceError::validation("conversation_repo is required"))?,
            message_repo: self
                .message_repo
                .ok_or_else(|| ServiceError::validation("message_repo is required"))?,
            directory: self
                .directory
                .ok_or_else(|| ServiceError::validation("directory is required"))?,
            media: self
                .media
                .ok_or_else(|| ServiceError::validation("media is required"))?,
            router: DeliveryRouter::new(Arc::clone(&presence)),
            presence,
            jwt_service: self
                .jwt_service
                .ok_or_else(|| ServiceError::validation("jwt_service is required"))?,
            snowflake_generator,
            max_avatar_bytes: self.max_avatar_bytes.unwrap_or(DEFAULT_MAX_AVATAR_BYTES),
        })
    }
}
