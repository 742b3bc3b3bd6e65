//! In-process real-time delivery
//!
//! The presence registry knows which users are connected; the delivery
//! router pushes events to them. Both are transport agnostic: the gateway
//! owns the sockets and drains each handle's queue.

mod delivery;
mod events;
mod presence;

pub use delivery::DeliveryRouter;
pub use events::{EventKind, InboxEvent};
pub use presence::{ClientHandle, DeliveryFailure, PresenceRegistry};
