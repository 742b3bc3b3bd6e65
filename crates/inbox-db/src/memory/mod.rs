//! In-memory storage backend
//!
//! Same contract as the PostgreSQL repositories; nothing survives a restart.

mod store;

pub use store::MemoryStore;
