//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store configuration error: {0}")]
    Config(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Row already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error (HTTP {status}): {body}")]
    Server { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_) | StoreError::RateLimited(_) | StoreError::Server { .. }
        )
    }

    /// Delay hint from a 429 response, when the server provided one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            StoreError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Map an HTTP error status to a store error.
    pub fn from_http_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => StoreError::PermissionDenied(body),
            404 => StoreError::NotFound(body),
            409 => StoreError::AlreadyExists(body),
            429 => StoreError::RateLimited(1000),
            500..=599 => StoreError::Server { status, body },
            _ => StoreError::RequestFailed(format!("HTTP {}: {}", status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(StoreError::RateLimited(500).is_retryable());
        assert!(StoreError::Server {
            status: 503,
            body: "unavailable".into()
        }
        .is_retryable());
        assert!(!StoreError::NotFound("jobs/x".into()).is_retryable());
        assert!(!StoreError::PermissionDenied("bad key".into()).is_retryable());
    }

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            StoreError::from_http_status(409, "dup".into()),
            StoreError::AlreadyExists(_)
        ));
        assert!(matches!(
            StoreError::from_http_status(403, "rls".into()),
            StoreError::PermissionDenied(_)
        ));
        assert!(matches!(
            StoreError::from_http_status(502, "bad gateway".into()),
            StoreError::Server { status: 502, .. }
        ));
    }
}
