//! Heartbeat handler (op 1)

use crate::connection::Connection;
use crate::protocol::GatewayMessage;

/// Handles heartbeat messages
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Push the timeout deadline back and acknowledge
    ///
    /// `last_sequence` is the last dispatch the client saw; it is only logged.
    pub fn handle(connection: &mut Connection, last_sequence: Option<u64>) -> GatewayMessage {
        connection.record_heartbeat();

        tracing::trace!(
            user_id = ?connection.user_id(),
            client_seq = ?last_sequence,
            server_seq = connection.current_sequence(),
            "Heartbeat received"
        );

        GatewayMessage::heartbeat_ack()
    }
}
