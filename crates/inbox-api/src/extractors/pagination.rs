//! Pagination extractor
//!
//! Cursor pagination from the query string: `before`, `after` and `limit`.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use inbox_core::Snowflake;
use inbox_service::services::message::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::Deserialize;

use crate::response::ApiError;

/// Raw pagination query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Parsed pagination parameters
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    /// Clamped to 1..=100
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

fn cursor(value: Option<String>, name: &str) -> Result<Option<Snowflake>, ApiError> {
    value
        .map(|s| {
            s.parse::<Snowflake>()
                .map_err(|_| ApiError::invalid_query(format!("Invalid '{name}' cursor format")))
        })
        .transpose()
}

impl TryFrom<PaginationParams> for Pagination {
    type Error = ApiError;

    fn try_from(params: PaginationParams) -> Result<Self, Self::Error> {
        Ok(Pagination {
            before: cursor(params.before, "before")?,
            after: cursor(params.after, "after")?,
            limit: params
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PaginationParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_query(e.body_text()))?;

        Pagination::try_from(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pagination() {
        let pagination = Pagination::try_from(PaginationParams::default()).unwrap();
        assert_eq!(pagination.limit, DEFAULT_PAGE_SIZE);
        assert!(pagination.before.is_none());
        assert!(pagination.after.is_none());
    }

    #[test]
    fn test_limit_clamping() {
        let params = PaginationParams {
            limit: Some(500),
            ..PaginationParams::default()
        };
        assert_eq!(Pagination::try_from(params).unwrap().limit, MAX_PAGE_SIZE);

        let params = PaginationParams {
            limit: Some(0),
            ..PaginationParams::default()
        };
        assert_eq!(Pagination::try_from(params).unwrap().limit, 1);
    }

    #[test]
    fn test_cursors() {
        let params = PaginationParams {
            before: Some("123456789".to_string()),
            after: None,
            limit: Some(25),
        };
        let pagination = Pagination::try_from(params).unwrap();
        assert_eq!(pagination.before, Some(Snowflake::new(123_456_789)));
        assert_eq!(pagination.limit, 25);

        let params = PaginationParams {
            after: Some("abc".to_string()),
            ..PaginationParams::default()
        };
        let err = Pagination::try_from(params).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_QUERY_PARAMETER");
    }
}
