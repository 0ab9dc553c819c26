//! The vendor-agnostic provider contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adforge_models::{AspectRatio, GenerationRequest, ProviderId};

use crate::error::ProviderResult;

/// Lifecycle phase a vendor reports for an in-flight generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Normalized status snapshot returned by [`GenerationProvider::check_status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub phase: GenerationPhase,
    /// Vendor-reported progress (0-100), when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Vendor-hosted result URL (often time-limited)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Vendor-reported failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn queued() -> Self {
        Self {
            phase: GenerationPhase::Queued,
            progress: None,
            result_url: None,
            thumbnail_url: None,
            error: None,
        }
    }

    pub fn processing(progress: Option<u8>) -> Self {
        Self {
            phase: GenerationPhase::Processing,
            progress,
            result_url: None,
            thumbnail_url: None,
            error: None,
        }
    }

    pub fn completed(result_url: impl Into<String>) -> Self {
        Self {
            phase: GenerationPhase::Completed,
            progress: Some(100),
            result_url: Some(result_url.into()),
            thumbnail_url: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            phase: GenerationPhase::Failed,
            progress: None,
            result_url: None,
            thumbnail_url: None,
            error: Some(error.into()),
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// Shared adapter construction options.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// HTTP client shared across adapters
    pub http: Client,
    /// Degrade 404/501 start failures to a synthetic `*-mock-*` job id.
    /// Dev-only; off by default.
    pub mock_fallback: bool,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(60))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            mock_fallback: false,
        }
    }
}

impl ProviderOptions {
    /// Read options from environment variables.
    pub fn from_env() -> Self {
        let mock_fallback = std::env::var("PROVIDER_MOCK_FALLBACK")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            mock_fallback,
            ..Self::default()
        }
    }
}

/// Contract every vendor integration implements.
///
/// Capability declarations (`supported_aspect_ratios`, `max_duration_secs`)
/// are advisory: adapters do not validate requests against them, the caller
/// does.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Stable provider identifier.
    fn id(&self) -> ProviderId;

    /// Aspect ratios this vendor accepts.
    fn supported_aspect_ratios(&self) -> &[AspectRatio];

    /// Maximum clip duration in seconds; `None` for image providers.
    fn max_duration_secs(&self) -> Option<u32>;

    /// Model names this adapter answers for (registry aliases).
    fn model_aliases(&self) -> &[&'static str] {
        &[]
    }

    /// Start a generation, returning the vendor-assigned job id.
    async fn start_generation(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> ProviderResult<String>;

    /// Poll the vendor for the current status of a generation.
    async fn check_status(&self, external_job_id: &str, api_key: &str)
        -> ProviderResult<StatusReport>;
}

/// Mint a synthetic job id for the dev mock fallback.
pub fn mock_job_id(provider: ProviderId) -> String {
    format!("{}-mock-{}", provider, Uuid::new_v4())
}

/// True if the id was minted by the mock fallback.
pub fn is_mock_job_id(external_job_id: &str) -> bool {
    external_job_id.contains("-mock-")
}

/// Synthetic completed report for mock job ids. No network call involved.
pub fn mock_status_report(external_job_id: &str, extension: &str) -> StatusReport {
    StatusReport::completed(format!(
        "https://assets.mock.adforge.dev/{}.{}",
        external_job_id, extension
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_job_id_detection() {
        let id = mock_job_id(ProviderId::Sora);
        assert!(id.starts_with("sora-mock-"));
        assert!(is_mock_job_id(&id));
        assert!(!is_mock_job_id("video_abc123"));
    }

    #[test]
    fn test_mock_status_report() {
        let report = mock_status_report("kling-mock-1234", "mp4");
        assert_eq!(report.phase, GenerationPhase::Completed);
        assert_eq!(
            report.result_url.as_deref(),
            Some("https://assets.mock.adforge.dev/kling-mock-1234.mp4")
        );
    }
}
