//! Message handlers
//!
//! Endpoints for message operations.

use axum::{extract::State, Json};
use inbox_service::dto::{MessagePage, MessageResponse, ReactionUpdateResponse, SendMessageRequest};
use inbox_service::MessageService;

use crate::extractors::{
    AuthUser, ConversationIdPath, MessageIdPath, Pagination, ReactionPath, SnowflakePath,
    ValidatedJson,
};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// Get messages in a conversation
///
/// GET /conversations/{conversation_id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ConversationIdPath>,
    pagination: Pagination,
) -> ApiResult<Json<MessagePage>> {
    let service = MessageService::new(state.service_context());
    let page = service
        .list(
            path.conversation_id()?,
            auth.user_id,
            pagination.before,
            pagination.after,
            pagination.limit,
        )
        .await?;
    Ok(Json(page))
}

/// Send a message
///
/// POST /conversations/{conversation_id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ConversationIdPath>,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let service = MessageService::new(state.service_context());
    let response = service
        .send(path.conversation_id()?, auth.user_id, request)
        .await?;
    Ok(Created(Json(response)))
}

/// Toggle the caller's reaction
///
/// PUT /messages/{message_id}/reactions/{emoji}
pub async fn toggle_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ReactionPath>,
) -> ApiResult<Json<ReactionUpdateResponse>> {
    let service = MessageService::new(state.service_context());
    let response = service
        .react(path.message_id()?, auth.user_id, path.emoji())
        .await?;
    Ok(Json(response))
}

/// Tombstone a message
///
/// DELETE /messages/{message_id}
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<MessageIdPath>,
) -> ApiResult<NoContent> {
    let service = MessageService::new(state.service_context());
    service.delete(path.message_id()?, auth.user_id).await?;
    Ok(NoContent)
}
