//! # inbox-gateway
//!
//! WebSocket transport for conversation events. A connection says HELLO,
//! waits for IDENTIFY, registers itself in the shared presence registry and
//! then forwards every event routed to its user as a DISPATCH frame.

pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use protocol::{CloseCode, GatewayMessage, OpCode};
pub use server::{gateway_handler, router, GatewaySettings, GatewayState, GATEWAY_PATH};
