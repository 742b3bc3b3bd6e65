//! Conversation service
//!
//! Handles private and group conversation lifecycle, membership, naming,
//! avatars and read state.

use std::collections::HashMap;
use std::sync::Arc;

use inbox_core::{Avatar, ChangeOutcome, Conversation, ConversationQuery, DomainError, Message, Snowflake};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::dto::{
    AddMembersRequest, ConversationResponse, CreateGroupRequest, LeaveOutcome, MemberRemoveEvent,
    MessageResponse, PrivateConversationResult, ReadReceiptResponse, RenameConversationRequest,
};
use crate::realtime::EventKind;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::message::MAX_PAGE_SIZE;
use super::{conversation_for, display_name, updated};

/// Conversation service
pub struct ConversationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ConversationService<'a> {
    /// Create a new ConversationService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Get a conversation the requester participates in
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        conversation_id: Snowflake,
        requester: Snowflake,
    ) -> ServiceResult<ConversationResponse> {
        let conversation = conversation_for(self.ctx, conversation_id, requester).await?;
        Ok(ConversationResponse::from(conversation))
    }

    /// The user's inbox, most recently updated first
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Snowflake,
        before: Option<Snowflake>,
        limit: i64,
    ) -> ServiceResult<Vec<ConversationResponse>> {
        let conversations = self
            .ctx
            .conversation_repo()
            .find_by_participant(
                user_id,
                ConversationQuery {
                    before,
                    limit: limit.clamp(1, MAX_PAGE_SIZE),
                },
            )
            .await?;
        Ok(conversations.iter().map(ConversationResponse::from).collect())
    }

    /// Return the private conversation for the pair, creating it if needed
    ///
    /// Concurrent calls for the same pair, in either order, all get the same
    /// conversation; exactly one of them reports `created`.
    #[instrument(skip(self))]
    pub async fn get_or_create_private(
        &self,
        requester: Snowflake,
        peer: Snowflake,
    ) -> ServiceResult<PrivateConversationResult> {
        if requester == peer {
            return Err(DomainError::SelfConversation.into());
        }

        if let Some(existing) = self
            .ctx
            .conversation_repo()
            .find_private(requester, peer)
            .await?
        {
            return Ok(PrivateConversationResult {
                conversation: existing.into(),
                created: false,
            });
        }

        if !self.ctx.directory().user_exists(peer).await? {
            return Err(DomainError::UserNotFound(peer).into());
        }

        let candidate = Conversation::new_private(self.ctx.generate_id(), requester, peer)?;
        let (conversation, created) = self
            .ctx
            .conversation_repo()
            .create_private(&candidate)
            .await?;

        let response = ConversationResponse::from(&conversation);
        if created {
            info!(conversation_id = %conversation.id, "Private conversation created");
            self.ctx.publish(
                conversation.participants(),
                EventKind::ConversationCreate,
                &response,
                Some(requester),
            );
        }

        Ok(PrivateConversationResult {
            conversation: response,
            created,
        })
    }

    /// Create a group from the creator plus the requested members
    #[instrument(skip(self, request))]
    pub async fn create_group(
        &self,
        creator: Snowflake,
        request: CreateGroupRequest,
    ) -> ServiceResult<ConversationResponse> {
        let conversation = Conversation::new_group(
            self.ctx.generate_id(),
            creator,
            &request.name,
            &request.member_ids,
        )?;

        for member in conversation.participants() {
            if *member != creator && !self.ctx.directory().user_exists(*member).await? {
                return Err(DomainError::UserNotFound(*member).into());
            }
        }

        let creator_name = display_name(self.ctx, creator).await;
        let opening = Message::info(
            self.ctx.generate_id(),
            conversation.id,
            format!(
                "{creator_name} created the group \"{}\"",
                conversation.name.as_deref().unwrap_or_default()
            ),
        );

        let stored = self
            .ctx
            .conversation_repo()
            .create_group(&conversation, std::slice::from_ref(&opening))
            .await?;

        info!(
            conversation_id = %stored.id,
            participants = stored.participants().len(),
            "Group created"
        );

        let response = ConversationResponse::from(&stored);
        self.ctx.publish(
            stored.participants(),
            EventKind::ConversationCreate,
            &response,
            Some(creator),
        );
        self.publish_info(&stored, &[opening]);

        Ok(response)
    }

    /// Add members to a group
    ///
    /// Ids already present are ignored. When nothing is left to add the call
    /// succeeds without writing an info message.
    #[instrument(skip(self, request))]
    pub async fn add_members(
        &self,
        conversation_id: Snowflake,
        requester: Snowflake,
        request: AddMembersRequest,
    ) -> ServiceResult<ConversationResponse> {
        let current = conversation_for(self.ctx, conversation_id, requester).await?;
        if !current.is_group() {
            return Err(DomainError::NotAGroup.into());
        }

        let mut names = HashMap::new();
        for user_id in &request.user_ids {
            if current.is_participant(*user_id) || names.contains_key(user_id) {
                continue;
            }
            if !self.ctx.directory().user_exists(*user_id).await? {
                return Err(DomainError::UserNotFound(*user_id).into());
            }
            names.insert(*user_id, display_name(self.ctx, *user_id).await);
        }
        let actor_name = display_name(self.ctx, requester).await;

        let ids = Arc::clone(self.ctx.snowflake_generator());
        let added_cell: Arc<Mutex<Vec<Snowflake>>> = Arc::default();
        let added_out = Arc::clone(&added_cell);
        let user_ids = request.user_ids;

        let outcome = self
            .ctx
            .conversation_repo()
            .update(
                conversation_id,
                Box::new(move |conversation| {
                    conversation.ensure_participant(requester)?;
                    let added = conversation.add_participants(&user_ids)?;
                    if added.is_empty() {
                        return Ok(vec![]);
                    }

                    let listed = added
                        .iter()
                        .map(|id| names.get(id).cloned().unwrap_or_else(|| id.to_string()))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let note = Message::info(
                        ids.generate(),
                        conversation.id,
                        format!("{actor_name} added {listed}"),
                    );
                    *added_out.lock() = added;
                    Ok(vec![note])
                }),
            )
            .await?;
        let (conversation, messages) = updated(outcome, conversation_id)?;
        let added = std::mem::take(&mut *added_cell.lock());

        let response = ConversationResponse::from(&conversation);
        if !added.is_empty() {
            info!(conversation_id = %conversation_id, added = added.len(), "Members added");

            self.ctx
                .publish(&added, EventKind::ConversationCreate, &response, None);
            let existing: Vec<Snowflake> = conversation
                .participants()
                .iter()
                .copied()
                .filter(|p| !added.contains(p))
                .collect();
            self.ctx.publish(
                &existing,
                EventKind::ConversationUpdate,
                &response,
                Some(requester),
            );
            self.publish_info(&conversation, &messages);
        }

        Ok(response)
    }

    /// Leave a group
    ///
    /// The last participant to leave deletes the group and all of its
    /// messages in the same unit of work.
    #[instrument(skip(self))]
    pub async fn leave(
        &self,
        conversation_id: Snowflake,
        requester: Snowflake,
    ) -> ServiceResult<LeaveOutcome> {
        let current = conversation_for(self.ctx, conversation_id, requester).await?;
        if !current.is_group() {
            return Err(DomainError::NotAGroup.into());
        }

        let name = display_name(self.ctx, requester).await;
        let ids = Arc::clone(self.ctx.snowflake_generator());

        let outcome = self
            .ctx
            .conversation_repo()
            .update(
                conversation_id,
                Box::new(move |conversation| {
                    conversation.remove_participant(requester)?;
                    if conversation.is_empty() {
                        return Ok(vec![]);
                    }
                    Ok(vec![Message::info(
                        ids.generate(),
                        conversation.id,
                        format!("{name} left the group"),
                    )])
                }),
            )
            .await?;

        match outcome {
            ChangeOutcome::Deleted {
                purged_messages, ..
            } => {
                info!(
                    conversation_id = %conversation_id,
                    purged_messages,
                    "Last participant left, group deleted"
                );
                Ok(LeaveOutcome {
                    conversation_id,
                    deleted: true,
                })
            }
            ChangeOutcome::Updated {
                conversation,
                messages,
            } => {
                info!(conversation_id = %conversation_id, user_id = %requester, "Participant left");
                self.ctx.publish(
                    conversation.participants(),
                    EventKind::ConversationMemberRemove,
                    &MemberRemoveEvent {
                        conversation_id,
                        user_id: requester,
                    },
                    None,
                );
                self.publish_info(&conversation, &messages);
                Ok(LeaveOutcome {
                    conversation_id,
                    deleted: false,
                })
            }
        }
    }

    /// Rename a group
    #[instrument(skip(self, request))]
    pub async fn rename(
        &self,
        conversation_id: Snowflake,
        requester: Snowflake,
        request: RenameConversationRequest,
    ) -> ServiceResult<ConversationResponse> {
        let current = conversation_for(self.ctx, conversation_id, requester).await?;
        if !current.is_group() {
            return Err(DomainError::NotAGroup.into());
        }

        let actor_name = display_name(self.ctx, requester).await;
        let ids = Arc::clone(self.ctx.snowflake_generator());

        let outcome = self
            .ctx
            .conversation_repo()
            .update(
                conversation_id,
                Box::new(move |conversation| {
                    conversation.ensure_participant(requester)?;
                    conversation.rename(&request.name)?;
                    let name = conversation.name.clone().unwrap_or_default();
                    Ok(vec![Message::info(
                        ids.generate(),
                        conversation.id,
                        format!("{actor_name} renamed the group to \"{name}\""),
                    )])
                }),
            )
            .await?;
        let (conversation, messages) = updated(outcome, conversation_id)?;

        info!(conversation_id = %conversation_id, "Group renamed");
        let response = self.publish_update(&conversation, requester);
        self.publish_info(&conversation, &messages);
        Ok(response)
    }

    /// Replace the group avatar
    ///
    /// The image is uploaded before the conversation is locked. If the change
    /// is rejected the upload is removed again; on success the displaced
    /// avatar is removed from media storage.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn set_avatar(
        &self,
        conversation_id: Snowflake,
        requester: Snowflake,
        data: Vec<u8>,
        content_type: &str,
    ) -> ServiceResult<ConversationResponse> {
        if !content_type.starts_with("image/") {
            return Err(ServiceError::validation("avatar must be an image"));
        }
        if data.is_empty() {
            return Err(ServiceError::validation("avatar must not be empty"));
        }
        if data.len() > self.ctx.max_avatar_bytes() {
            return Err(ServiceError::validation(format!(
                "avatar must be at most {} bytes",
                self.ctx.max_avatar_bytes()
            )));
        }

        let current = conversation_for(self.ctx, conversation_id, requester).await?;
        if !current.is_group() {
            return Err(DomainError::NotAGroup.into());
        }

        let actor_name = display_name(self.ctx, requester).await;
        let stored = self.ctx.media().store(data, content_type).await?;
        let upload_handle = stored.handle.clone();

        let ids = Arc::clone(self.ctx.snowflake_generator());
        let displaced_cell: Arc<Mutex<Option<Avatar>>> = Arc::default();
        let displaced_out = Arc::clone(&displaced_cell);

        let result = self
            .ctx
            .conversation_repo()
            .update(
                conversation_id,
                Box::new(move |conversation| {
                    conversation.ensure_participant(requester)?;
                    if !conversation.is_group() {
                        return Err(DomainError::NotAGroup);
                    }
                    *displaced_out.lock() = conversation.replace_avatar(Avatar::from(stored));
                    Ok(vec![Message::info(
                        ids.generate(),
                        conversation.id,
                        format!("{actor_name} changed the group avatar"),
                    )])
                }),
            )
            .await
            .map_err(ServiceError::from)
            .and_then(|outcome| updated(outcome, conversation_id));

        let (conversation, messages) = match result {
            Ok(applied) => applied,
            Err(e) => {
                if let Err(cleanup) = self.ctx.media().delete(&upload_handle).await {
                    warn!(handle = %upload_handle, error = %cleanup, "Failed to remove rejected avatar upload");
                }
                return Err(e);
            }
        };

        let displaced = displaced_cell.lock().take();
        if let Some(old) = displaced {
            if let Err(e) = self.ctx.media().delete(&old.handle).await {
                warn!(handle = %old.handle, error = %e, "Failed to remove replaced avatar");
            }
        }

        info!(conversation_id = %conversation_id, "Group avatar changed");
        let response = self.publish_update(&conversation, requester);
        self.publish_info(&conversation, &messages);
        Ok(response)
    }

    /// Reset the reader's unread counter and mark others' messages read
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        conversation_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<ReadReceiptResponse> {
        let receipt = self
            .ctx
            .conversation_repo()
            .mark_read(conversation_id, user_id)
            .await?;

        let response = ReadReceiptResponse::new(&receipt, user_id);
        self.ctx.publish(
            receipt.conversation.participants(),
            EventKind::ConversationRead,
            &response,
            Some(user_id),
        );
        Ok(response)
    }

    fn publish_update(&self, conversation: &Conversation, actor: Snowflake) -> ConversationResponse {
        let response = ConversationResponse::from(conversation);
        self.ctx.publish(
            conversation.participants(),
            EventKind::ConversationUpdate,
            &response,
            Some(actor),
        );
        response
    }

    fn publish_info(&self, conversation: &Conversation, messages: &[Message]) {
        for message in messages {
            self.ctx.publish(
                conversation.participants(),
                EventKind::MessageCreate,
                &MessageResponse::from(message),
                None,
            );
        }
    }
}
