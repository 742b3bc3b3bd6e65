//! Best-effort push of events to a conversation's participants

use std::sync::Arc;

use inbox_core::Snowflake;
use tracing::debug;

use super::events::InboxEvent;
use super::presence::PresenceRegistry;

/// Fire-and-forget fan-out through the presence registry
///
/// Offline participants, full queues and closed connections are skipped.
/// Nothing is queued for later and nothing is retried.
#[derive(Debug, Clone)]
pub struct DeliveryRouter {
    presence: Arc<PresenceRegistry>,
}

impl DeliveryRouter {
    pub fn new(presence: Arc<PresenceRegistry>) -> Self {
        Self { presence }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Push `event` to every participant except `exclude`
    ///
    /// Returns how many connections accepted the event.
    pub fn push_to_participants(
        &self,
        participants: &[Snowflake],
        event: &InboxEvent,
        exclude: Option<Snowflake>,
    ) -> usize {
        let mut reached = 0;
        for user_id in participants.iter().copied() {
            if Some(user_id) == exclude {
                continue;
            }
            let Some(handle) = self.presence.resolve(user_id) else {
                continue;
            };
            match handle.try_send(event.clone()) {
                Ok(()) => reached += 1,
                Err(reason) => {
                    debug!(user_id = %user_id, event = %event.kind, %reason, "Push skipped");
                }
            }
        }
        reached
    }
}
