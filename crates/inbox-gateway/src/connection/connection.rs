//! State of one WebSocket connection
//!
//! Owned by the task that drives the socket, so nothing here is shared.

use std::time::Duration;

use inbox_core::Snowflake;
use inbox_service::{ClientHandle, InboxEvent};
use tokio::time::Instant;

use crate::protocol::GatewayMessage;

/// A single WebSocket connection
pub struct Connection {
    /// Presence handle, set by a successful Identify
    handle: Option<ClientHandle>,

    /// Last dispatch sequence sent
    sequence: u64,

    last_heartbeat: Instant,
    heartbeat_timeout: Duration,
}

impl Connection {
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self {
            handle: None,
            sequence: 0,
            last_heartbeat: Instant::now(),
            heartbeat_timeout,
        }
    }

    pub fn is_identified(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&ClientHandle> {
        self.handle.as_ref()
    }

    pub fn user_id(&self) -> Option<Snowflake> {
        self.handle.as_ref().map(ClientHandle::user_id)
    }

    /// Bind the connection to its registered presence handle
    pub fn identify(&mut self, handle: ClientHandle) {
        self.handle = Some(handle);
    }

    /// Give up the handle so the caller can unregister it
    pub fn take_handle(&mut self) -> Option<ClientHandle> {
        self.handle.take()
    }

    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    /// Wrap an event in a dispatch frame with the next sequence number
    pub fn dispatch(&mut self, event: &InboxEvent) -> GatewayMessage {
        let sequence = self.next_sequence();
        GatewayMessage::dispatch(event, sequence)
    }

    pub fn record_heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    /// When the connection times out unless another heartbeat arrives
    pub fn heartbeat_deadline(&self) -> Instant {
        self.last_heartbeat + self.heartbeat_timeout
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("user_id", &self.user_id())
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inbox_service::EventKind;

    #[test]
    fn test_connection_starts_unidentified() {
        let conn = Connection::new(Duration::from_secs(90));
        assert!(!conn.is_identified());
        assert!(conn.user_id().is_none());
        assert_eq!(conn.current_sequence(), 0);
    }

    #[test]
    fn test_identify_binds_user() {
        let mut conn = Connection::new(Duration::from_secs(90));
        let (handle, _rx) = ClientHandle::channel(Snowflake::new(5), 4);
        conn.identify(handle);

        assert!(conn.is_identified());
        assert_eq!(conn.user_id(), Some(Snowflake::new(5)));

        assert!(conn.take_handle().is_some());
        assert!(!conn.is_identified());
    }

    #[test]
    fn test_dispatch_sequence_increases() {
        let mut conn = Connection::new(Duration::from_secs(90));
        let event = InboxEvent::new(EventKind::ConversationRead, &serde_json::json!({}));

        assert_eq!(conn.dispatch(&event).s, Some(1));
        assert_eq!(conn.dispatch(&event).s, Some(2));
        assert_eq!(conn.current_sequence(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_moves_deadline() {
        let mut conn = Connection::new(Duration::from_secs(10));
        let first = conn.heartbeat_deadline();

        tokio::time::advance(Duration::from_secs(4)).await;
        conn.record_heartbeat();

        assert_eq!(conn.heartbeat_deadline() - first, Duration::from_secs(4));
    }
}
