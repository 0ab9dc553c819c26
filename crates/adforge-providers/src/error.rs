//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur when talking to a generation vendor.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown provider '{given}', valid providers: {valid}")]
    UnknownProvider { given: String, valid: String },

    #[error("{provider} endpoint not implemented (HTTP {status})")]
    NotImplemented { provider: &'static str, status: u16 },

    #[error("{provider} returned HTTP {status}: {body}")]
    Vendor {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn vendor(provider: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Vendor {
            provider,
            status,
            body: body.into(),
        }
    }

    pub fn invalid_response(provider: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    /// True for the "vendor API not implemented" class of HTTP failures
    /// (404/501), which the dev mock fallback is allowed to absorb.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, ProviderError::NotImplemented { .. })
    }
}
