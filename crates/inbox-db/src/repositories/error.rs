//! Mapping of sqlx failures into domain errors

use inbox_core::error::DomainError;
use inbox_core::value_objects::Snowflake;
use sqlx::Error as SqlxError;
use tracing::warn;

/// Convert an sqlx error into a storage failure
///
/// Pool exhaustion is reported separately so it stands out in logs.
pub fn map_db_error(e: SqlxError) -> DomainError {
    match e {
        SqlxError::PoolTimedOut => {
            warn!("Timed out waiting for a database connection");
            DomainError::DatabaseError("connection pool exhausted".to_string())
        }
        other => DomainError::DatabaseError(other.to_string()),
    }
}

/// Like [`map_db_error`], but a unique violation becomes `on_unique()`
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => on_unique(),
        _ => map_db_error(e),
    }
}

/// The row was not there when locked, or was deleted by a concurrent leave
pub fn conversation_not_found(id: Snowflake) -> DomainError {
    DomainError::ConversationNotFound(id)
}

pub fn message_not_found(id: Snowflake) -> DomainError {
    DomainError::MessageNotFound(id)
}
