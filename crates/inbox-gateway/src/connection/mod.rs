//! Per-connection state

mod connection;

pub use connection::Connection;
