//! Route definitions
//!
//! All API routes organized by domain and mounted under /api/v1.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{conversations, health, messages};
use crate::state::AppState;

/// Prefix shared by every REST route except health
pub const API_PREFIX: &str = "/api/v1";

/// Create the main API router (health is exported separately so it bypasses
/// the middleware stack)
pub fn create_router(max_avatar_bytes: usize) -> Router<AppState> {
    Router::new().nest(API_PREFIX, api_v1_routes(max_avatar_bytes))
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn api_v1_routes(max_avatar_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(conversation_routes(max_avatar_bytes))
        .merge(message_routes())
}

fn conversation_routes(max_avatar_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/conversations", get(conversations::list_conversations))
        .route("/conversations/private", post(conversations::create_private))
        .route("/conversations/groups", post(conversations::create_group))
        .route(
            "/conversations/:conversation_id",
            get(conversations::get_conversation).patch(conversations::rename_conversation),
        )
        .route(
            "/conversations/:conversation_id/avatar",
            put(conversations::set_avatar).layer(DefaultBodyLimit::max(max_avatar_bytes)),
        )
        .route(
            "/conversations/:conversation_id/members",
            post(conversations::add_members),
        )
        .route(
            "/conversations/:conversation_id/members/@me",
            delete(conversations::leave_conversation),
        )
        .route(
            "/conversations/:conversation_id/read",
            post(conversations::mark_read),
        )
        .route(
            "/conversations/:conversation_id/messages",
            get(messages::list_messages).post(messages::send_message),
        )
}

fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages/:message_id", delete(messages::delete_message))
        .route(
            "/messages/:message_id/reactions/:emoji",
            put(messages::toggle_reaction),
        )
}
