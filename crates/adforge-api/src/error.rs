//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use adforge_engine::EngineError;
use adforge_providers::ProviderError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Upstream provider error: {0}")]
    UpstreamProvider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamProvider(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Validation(msg) => ApiError::BadRequest(msg),
            EngineError::JobNotFound(id) => ApiError::NotFound(format!("job {}", id)),
            EngineError::MissingApiKey { .. } => ApiError::BadRequest(e.to_string()),
            EngineError::Provider(ProviderError::UnknownProvider { .. }) => {
                ApiError::BadRequest(e.to_string())
            }
            EngineError::Provider(inner) => ApiError::UpstreamProvider(inner.to_string()),
            EngineError::Store(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let error = match &self {
            ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adforge_models::JobId;

    #[test]
    fn test_engine_error_mapping() {
        let e: ApiError = EngineError::JobNotFound(JobId::from("j1")).into();
        assert!(matches!(e, ApiError::NotFound(_)));

        let e: ApiError = EngineError::validation("bad ratio").into();
        assert!(matches!(e, ApiError::BadRequest(_)));

        let e: ApiError =
            EngineError::Provider(ProviderError::vendor("sora", 500, "boom")).into();
        assert!(matches!(e, ApiError::UpstreamProvider(_)));
    }
}
