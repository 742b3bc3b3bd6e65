//! Business logic services
//!
//! Every operation persists first and pushes second: events go out only
//! after the store has committed, and a failed push never undoes a write.

pub mod context;
pub mod conversation;
pub mod error;
pub mod message;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::{ServiceContext, ServiceContextBuilder, DEFAULT_MAX_AVATAR_BYTES};
pub use conversation::ConversationService;
pub use error::{ServiceError, ServiceResult};
pub use message::MessageService;

use inbox_core::{ChangeOutcome, Conversation, DomainError, ForeignKind, Message, Snowflake};
use tracing::debug;

/// Load a conversation the caller participates in
///
/// Absent conversations are NotFound; non-members get NotParticipant.
pub(crate) async fn conversation_for(
    ctx: &ServiceContext,
    conversation_id: Snowflake,
    user_id: Snowflake,
) -> ServiceResult<Conversation> {
    let conversation = ctx
        .conversation_repo()
        .find_by_id(conversation_id)
        .await?
        .ok_or(DomainError::ConversationNotFound(conversation_id))?;
    conversation.ensure_participant(user_id)?;
    Ok(conversation)
}

/// Unwrap an update that cannot empty a group
///
/// Only leaving removes participants, so for every other change a deleted
/// outcome means the conversation vanished underneath the caller.
pub(crate) fn updated(
    outcome: ChangeOutcome,
    conversation_id: Snowflake,
) -> ServiceResult<(Conversation, Vec<Message>)> {
    match outcome {
        ChangeOutcome::Updated {
            conversation,
            messages,
        } => Ok((conversation, messages)),
        ChangeOutcome::Deleted { .. } => {
            Err(DomainError::ConversationNotFound(conversation_id).into())
        }
    }
}

/// Name used in info messages
///
/// Falls back to the id when the profile directory has no answer.
pub(crate) async fn display_name(ctx: &ServiceContext, user_id: Snowflake) -> String {
    match ctx.directory().resolve(ForeignKind::Profile, user_id).await {
        Ok(Some(profile)) => profile.title,
        Ok(None) => user_id.to_string(),
        Err(e) => {
            debug!(user_id = %user_id, error = %e, "Display name lookup failed");
            user_id.to_string()
        }
    }
}
