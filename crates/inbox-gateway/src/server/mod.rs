//! Gateway routes
//!
//! The gateway is mounted on the API server so both share one presence
//! registry.

mod handler;
pub(crate) mod state;

pub use handler::gateway_handler;
pub use state::{GatewaySettings, GatewayState};

use axum::{routing::get, Router};

/// Path the WebSocket upgrade is served on
pub const GATEWAY_PATH: &str = "/gateway";

/// Router serving the WebSocket upgrade, ready to merge into the app
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(GATEWAY_PATH, get(gateway_handler))
        .with_state(state)
}
