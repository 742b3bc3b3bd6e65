//! # inbox-db
//!
//! Storage layer implementing the inbox-core repository traits.
//!
//! ## Overview
//!
//! Two interchangeable backends:
//!
//! - PostgreSQL via SQLx: connection pool, schema bootstrap, `FromRow`
//!   models, entity <-> model mappers, and the `Pg*Repository` types
//! - [`MemoryStore`]: a process-local store for tests and single-node demos
//!
//! ## Usage
//!
//! ```rust,ignore
//! use inbox_db::pool::{apply_schema, create_pool, DatabaseConfig};
//! use inbox_db::PgConversationRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new("postgres://localhost/inbox", 10, 1);
//!     let pool = create_pool(&config).await?;
//!     apply_schema(&pool).await?;
//!     let conversations = PgConversationRepository::new(pool);
//!
//!     // Use the repository...
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use pool::{apply_schema, create_pool, DatabaseConfig, PgPool};
pub use repositories::{PgConversationRepository, PgMessageRepository};
