//! Presence registry - which users are reachable right now, and through
//! which connection
//!
//! A user is reachable through at most one connection. Registering again
//! replaces the previous handle (last registration wins), and a connection
//! can only ever remove its own entry, so a late disconnect of a replaced
//! connection never evicts the newer one.

use std::sync::Arc;

use dashmap::DashMap;
use inbox_core::Snowflake;
use tokio::sync::{mpsc, Notify};
use tracing::debug;
use uuid::Uuid;

use super::events::InboxEvent;

/// Why an event could not be handed to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection is closed")]
    Closed,
}

/// A live connection: its identity plus a bounded outbound queue
#[derive(Debug, Clone)]
pub struct ClientHandle {
    user_id: Snowflake,
    session_id: Uuid,
    sender: mpsc::Sender<InboxEvent>,
    superseded: Arc<Notify>,
}

impl ClientHandle {
    /// Create a handle for `user_id` with a fresh session id
    ///
    /// The receiver is drained by the transport that owns the connection.
    pub fn channel(user_id: Snowflake, buffer: usize) -> (Self, mpsc::Receiver<InboxEvent>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let handle = Self {
            user_id,
            session_id: Uuid::new_v4(),
            sender,
            superseded: Arc::new(Notify::new()),
        };
        (handle, receiver)
    }

    pub fn user_id(&self) -> Snowflake {
        self.user_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Same connection, not merely the same user
    pub fn same_connection(&self, other: &Self) -> bool {
        self.session_id == other.session_id
    }

    /// Queue an event without waiting
    pub fn try_send(&self, event: InboxEvent) -> Result<(), DeliveryFailure> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryFailure::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Tell the owning transport that a newer connection replaced this one
    pub fn supersede(&self) {
        self.superseded.notify_one();
    }

    /// Resolves once [`supersede`](Self::supersede) has been called
    pub async fn superseded(&self) {
        self.superseded.notified().await;
    }
}

/// Process-wide map from user id to live connection handle
///
/// Built once at startup and shared through an `Arc`.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    connections: DashMap<Snowflake, ClientHandle>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `handle` the user's connection, returning the one it replaces
    pub fn register(&self, handle: ClientHandle) -> Option<ClientHandle> {
        let user_id = handle.user_id;
        let displaced = self.connections.insert(user_id, handle);
        debug!(user_id = %user_id, replaced = displaced.is_some(), "Connection registered");
        displaced
    }

    /// Remove the user's entry only if it is still exactly this connection
    ///
    /// Returns whether an entry was removed.
    pub fn unregister(&self, handle: &ClientHandle) -> bool {
        let removed = self
            .connections
            .remove_if(&handle.user_id, |_, current| current.same_connection(handle))
            .is_some();
        debug!(user_id = %handle.user_id, removed, "Connection unregistered");
        removed
    }

    pub fn resolve(&self, user_id: Snowflake) -> Option<ClientHandle> {
        self.connections.get(&user_id).map(|h| h.value().clone())
    }

    pub fn is_online(&self, user_id: Snowflake) -> bool {
        self.connections.contains_key(&user_id)
    }

    /// Number of users with a live connection
    pub fn online_count(&self) -> usize {
        self.connections.len()
    }
}
