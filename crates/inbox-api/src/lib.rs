//! # inbox-api
//!
//! HTTP server for the inbox: REST routes under `/api/v1`, health probes, and
//! the WebSocket gateway mounted on the same listener so the services and the
//! gateway share one presence registry.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, create_app_state, run, serve, ServerError};
pub use state::AppState;
