//! Conversation handlers
//!
//! Inbox listing, private and group creation, and group management.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use inbox_service::dto::{
    AddMembersRequest, ConversationResponse, CreateGroupRequest, CreatePrivateRequest,
    LeaveOutcome, PrivateConversationResult, ReadReceiptResponse, RenameConversationRequest,
};
use inbox_service::ConversationService;

use crate::extractors::{AuthUser, ConversationIdPath, Pagination, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// The caller's conversations, most recently updated first
///
/// GET /conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    pagination: Pagination,
) -> ApiResult<Json<Vec<ConversationResponse>>> {
    let service = ConversationService::new(state.service_context());
    let conversations = service
        .list_for_user(auth.user_id, pagination.before, pagination.limit)
        .await?;
    Ok(Json(conversations))
}

/// Open the private conversation with another user
///
/// POST /conversations/private
///
/// 201 when this call created it, 200 when it already existed.
pub async fn create_private(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreatePrivateRequest>,
) -> ApiResult<(StatusCode, Json<PrivateConversationResult>)> {
    let service = ConversationService::new(state.service_context());
    let result = service
        .get_or_create_private(auth.user_id, request.user_id)
        .await?;

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)))
}

/// POST /conversations/groups
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateGroupRequest>,
) -> ApiResult<Created<Json<ConversationResponse>>> {
    let service = ConversationService::new(state.service_context());
    let response = service.create_group(auth.user_id, request).await?;
    Ok(Created(Json(response)))
}

/// GET /conversations/{conversation_id}
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ConversationIdPath>,
) -> ApiResult<Json<ConversationResponse>> {
    let service = ConversationService::new(state.service_context());
    let response = service.get(path.conversation_id()?, auth.user_id).await?;
    Ok(Json(response))
}

/// Rename a group
///
/// PATCH /conversations/{conversation_id}
pub async fn rename_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ConversationIdPath>,
    ValidatedJson(request): ValidatedJson<RenameConversationRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let service = ConversationService::new(state.service_context());
    let response = service
        .rename(path.conversation_id()?, auth.user_id, request)
        .await?;
    Ok(Json(response))
}

/// Replace a group's avatar with the raw image in the body
///
/// PUT /conversations/{conversation_id}/avatar
pub async fn set_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ConversationIdPath>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation_id = path.conversation_id()?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let service = ConversationService::new(state.service_context());
    let response = service
        .set_avatar(conversation_id, auth.user_id, body.to_vec(), content_type)
        .await?;
    Ok(Json(response))
}

/// POST /conversations/{conversation_id}/members
pub async fn add_members(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ConversationIdPath>,
    ValidatedJson(request): ValidatedJson<AddMembersRequest>,
) -> ApiResult<Json<ConversationResponse>> {
    let service = ConversationService::new(state.service_context());
    let response = service
        .add_members(path.conversation_id()?, auth.user_id, request)
        .await?;
    Ok(Json(response))
}

/// Leave a group; the last one out deletes it
///
/// DELETE /conversations/{conversation_id}/members/@me
pub async fn leave_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ConversationIdPath>,
) -> ApiResult<Json<LeaveOutcome>> {
    let service = ConversationService::new(state.service_context());
    let outcome = service.leave(path.conversation_id()?, auth.user_id).await?;
    Ok(Json(outcome))
}

/// POST /conversations/{conversation_id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ConversationIdPath>,
) -> ApiResult<Json<ReadReceiptResponse>> {
    let service = ConversationService::new(state.service_context());
    let receipt = service
        .mark_read(path.conversation_id()?, auth.user_id)
        .await?;
    Ok(Json(receipt))
}
