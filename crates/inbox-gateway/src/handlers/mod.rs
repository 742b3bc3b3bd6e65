//! Op code handlers
//!
//! Route incoming client frames to the handler for their op code.

mod error;
mod heartbeat;
mod identify;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;

use inbox_service::InboxEvent;
use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::protocol::{GatewayMessage, OpCode};
use crate::server::GatewayState;

/// What the socket loop does after a frame was handled
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Send this frame back
    Reply(GatewayMessage),
    /// The connection identified; start draining its event queue
    Identified(mpsc::Receiver<InboxEvent>),
}

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one client frame
    ///
    /// Identify must come first; any other client op before it is rejected.
    pub fn dispatch(
        state: &GatewayState,
        connection: &mut Connection,
        message: &GatewayMessage,
    ) -> HandlerResult<HandlerOutcome> {
        if !message.op.is_client_op() {
            tracing::warn!(op = %message.op, "Received server-only op code from client");
            return Err(HandlerError::server_only(message.op));
        }

        if let Some(payload) = message.as_identify() {
            return IdentifyHandler::handle(state, connection, &payload)
                .map(HandlerOutcome::Identified);
        }
        if message.op == OpCode::Identify {
            return Err(HandlerError::InvalidPayload(
                "Identify requires a token".to_string(),
            ));
        }

        if !connection.is_identified() {
            return Err(HandlerError::NotAuthenticated);
        }

        match message.as_heartbeat_seq() {
            Some(seq) => Ok(HandlerOutcome::Reply(HeartbeatHandler::handle(
                connection, seq,
            ))),
            None => Err(HandlerError::server_only(message.op)),
        }
    }
}
