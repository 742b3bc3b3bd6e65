//! Message service
//!
//! Handles sending typed messages, history pages, reactions and deletion.

use std::sync::Arc;

use futures::future::join_all;
use inbox_core::{DomainError, ForeignPreview, Message, MessageQuery, Snowflake};
use tracing::{info, instrument, warn};

use crate::dto::{
    MessageDeleteEvent, MessagePage, MessageResponse, ReactionUpdateResponse, SendMessageRequest,
};
use crate::realtime::EventKind;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::validation::{message_body, validate_emoji};
use super::{conversation_for, updated};

/// Default history page size
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest history page a caller may ask for
pub const MAX_PAGE_SIZE: i64 = 100;

/// Message service
pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    /// Create a new MessageService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Send a message
    ///
    /// The message, `last_message_id` and every other participant's unread
    /// counter are stored together; the push to online participants follows.
    #[instrument(skip(self, request), fields(kind = request.kind.as_str()))]
    pub async fn send(
        &self,
        conversation_id: Snowflake,
        sender_id: Snowflake,
        request: SendMessageRequest,
    ) -> ServiceResult<MessageResponse> {
        let body = message_body(&request)?;
        conversation_for(self.ctx, conversation_id, sender_id).await?;

        let preview = match body.reference() {
            Some((kind, id)) => Some(self.ctx.directory().resolve(kind, id).await?.ok_or(
                DomainError::ReferenceNotFound {
                    kind: kind.as_str(),
                    id,
                },
            )?),
            None => None,
        };

        if let Some(reply_to) = request.reply_to {
            let target = self.ctx.message_repo().find_by_id(reply_to).await?;
            if target.map(|m| m.conversation_id) != Some(conversation_id) {
                return Err(DomainError::InvalidReply(reply_to).into());
            }
        }

        let ids = Arc::clone(self.ctx.snowflake_generator());
        let reply_to = request.reply_to;
        let outcome = self
            .ctx
            .conversation_repo()
            .update(
                conversation_id,
                Box::new(move |conversation| {
                    conversation.ensure_participant(sender_id)?;
                    let message = Message::new(ids.generate(), conversation.id, Some(sender_id), body)
                        .with_reply_to(reply_to);
                    Ok(vec![message])
                }),
            )
            .await?;
        let (conversation, messages) = updated(outcome, conversation_id)?;
        let message = messages
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::internal("message was not stored"))?;

        info!(message_id = %message.id, conversation_id = %conversation_id, "Message sent");

        let response = MessageResponse::from(&message).with_preview(preview);
        self.ctx.publish(
            conversation.participants(),
            EventKind::MessageCreate,
            &response,
            None,
        );
        Ok(response)
    }

    /// Page of history, returned oldest first
    ///
    /// With only `after` set the page starts right after that message;
    /// otherwise it ends right before `before` (or at the newest message).
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        conversation_id: Snowflake,
        requester: Snowflake,
        before: Option<Snowflake>,
        after: Option<Snowflake>,
        limit: i64,
    ) -> ServiceResult<MessagePage> {
        conversation_for(self.ctx, conversation_id, requester).await?;

        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let mut messages = self
            .ctx
            .message_repo()
            .find_by_conversation(
                conversation_id,
                MessageQuery {
                    before,
                    after,
                    limit: limit + 1,
                },
            )
            .await?;

        // One extra row was fetched to learn whether more exist beyond the page
        let has_more = messages.len() as i64 > limit;
        if has_more {
            if after.is_some() && before.is_none() {
                messages.remove(0);
            } else {
                messages.pop();
            }
        }
        messages.reverse();

        let previews = join_all(messages.iter().map(|m| self.preview_of(m))).await;
        let messages = messages
            .iter()
            .zip(previews)
            .map(|(message, preview)| MessageResponse::from(message).with_preview(preview))
            .collect();

        Ok(MessagePage { messages, has_more })
    }

    /// Toggle the user's reaction with `emoji`
    #[instrument(skip(self))]
    pub async fn react(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        emoji: &str,
    ) -> ServiceResult<ReactionUpdateResponse> {
        let emoji = validate_emoji(emoji)?;
        let message = self
            .ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?;

        let conversation = conversation_for(self.ctx, message.conversation_id, user_id).await?;
        if message.is_tombstone() {
            return Err(DomainError::MessageAlreadyDeleted.into());
        }

        let message = self
            .ctx
            .message_repo()
            .toggle_reaction(message_id, user_id, emoji)
            .await?;

        let response = ReactionUpdateResponse::from(&message);
        self.ctx.publish(
            conversation.participants(),
            EventKind::MessageReactionUpdate,
            &response,
            None,
        );
        Ok(response)
    }

    /// Turn the sender's message into a tombstone
    #[instrument(skip(self))]
    pub async fn delete(&self, message_id: Snowflake, requester: Snowflake) -> ServiceResult<()> {
        let message = self
            .ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound(message_id))?;

        message.ensure_sender(requester)?;
        if message.is_tombstone() {
            return Err(DomainError::MessageAlreadyDeleted.into());
        }

        let deleted = self.ctx.message_repo().tombstone(message_id).await?;
        info!(message_id = %message_id, conversation_id = %deleted.conversation_id, "Message deleted");

        if let Some(conversation) = self
            .ctx
            .conversation_repo()
            .find_by_id(deleted.conversation_id)
            .await?
        {
            self.ctx.publish(
                conversation.participants(),
                EventKind::MessageDelete,
                &MessageDeleteEvent {
                    message_id,
                    conversation_id: deleted.conversation_id,
                },
                None,
            );
        }
        Ok(())
    }

    /// Display projection for reference messages; lookup failures are
    /// tolerated so history still loads when the directory is down
    async fn preview_of(&self, message: &Message) -> Option<ForeignPreview> {
        let (kind, id) = message.body.reference()?;
        match self.ctx.directory().resolve(kind, id).await {
            Ok(preview) => preview,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Preview lookup failed");
                None
            }
        }
    }
}
