//! Identify handler (op 2)

use inbox_service::{ClientHandle, EventKind, InboxEvent};
use tokio::sync::mpsc;

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{IdentifyPayload, ReadyPayload};
use crate::server::GatewayState;

/// Handles Identify messages
pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Authenticate the connection and make it the user's presence handle
    ///
    /// READY is queued on the new handle before it is registered, so it is
    /// always the first dispatch the client sees. A connection this one
    /// displaces is told to close.
    pub fn handle(
        state: &GatewayState,
        connection: &mut Connection,
        payload: &IdentifyPayload,
    ) -> HandlerResult<mpsc::Receiver<InboxEvent>> {
        if connection.is_identified() {
            tracing::warn!(
                user_id = ?connection.user_id(),
                "Client sent Identify while already authenticated"
            );
            return Err(HandlerError::AlreadyAuthenticated);
        }

        let user_id = state
            .jwt_service()
            .authenticate(&payload.token)
            .inspect_err(|e| tracing::debug!(error = %e, "Token validation failed"))?;

        let (handle, events) = ClientHandle::channel(user_id, state.settings().outbound_buffer);
        let ready = ReadyPayload {
            user_id,
            session_id: handle.session_id(),
        };
        handle
            .try_send(InboxEvent::new(EventKind::Ready, &ready))
            .map_err(|e| HandlerError::Internal(format!("Failed to queue READY: {e}")))?;

        if let Some(previous) = state.presence().register(handle.clone()) {
            tracing::info!(
                user_id = %user_id,
                replaced_session = %previous.session_id(),
                "Newer connection replaces existing session"
            );
            previous.supersede();
        }

        tracing::info!(
            user_id = %user_id,
            session_id = %handle.session_id(),
            "Client identified"
        );
        connection.identify(handle);

        Ok(events)
    }
}
