//! Crate-wide error type and result alias
//!
//! The error taxonomy is deliberately flat: validation problems map to 400,
//! missing content to 404, auth failures to 401/403, and everything else
//! (database, upstream HTTP) to 500 with a generic message. Soft misses
//! (a filter that matches nothing, a page beyond the last day) are NOT
//! errors; they are successful empty responses handled at the route layer.

use hyper::StatusCode;
use thiserror::Error;

/// Errors surfaced by the veerive service
#[derive(Debug, Error)]
pub enum VeeriveError {
    /// Malformed request: missing field, bad id, page zero, etc.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Authenticated but not allowed (e.g. acting on another user's account)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// MongoDB failures
    #[error("Database error: {0}")]
    Database(String),

    /// Failures reading or proxying HTTP (bad body, upstream OAuth provider)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Bad or incomplete service configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (socket bind, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VeeriveError {
    /// HTTP status for this error per the flat taxonomy
    pub fn status_code(&self) -> StatusCode {
        match self {
            VeeriveError::Validation(_) => StatusCode::BAD_REQUEST,
            VeeriveError::NotFound(_) => StatusCode::NOT_FOUND,
            VeeriveError::Auth(_) => StatusCode::UNAUTHORIZED,
            VeeriveError::Forbidden(_) => StatusCode::FORBIDDEN,
            VeeriveError::Database(_)
            | VeeriveError::Http(_)
            | VeeriveError::Config(_)
            | VeeriveError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, VeeriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_flat() {
        assert_eq!(
            VeeriveError::Validation("page must be >= 1".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VeeriveError::NotFound("context".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            VeeriveError::Auth("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            VeeriveError::Database("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            VeeriveError::Http("body too large".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
