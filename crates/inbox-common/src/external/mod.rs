//! Adapters for collaborator services
//!
//! Production adapters talk to the real collaborators; the in-memory ones back
//! the memory storage mode and the test suites.

mod directory;
mod media;

pub use directory::{HttpDirectory, MemoryDirectory};
pub use media::{LocalMediaStorage, MemoryMediaStorage};
