//! OpenAI Sora video generation adapter.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use adforge_models::{AspectRatio, GenerationRequest, ProviderId};

use crate::adapter::{
    is_mock_job_id, mock_job_id, mock_status_report, GenerationProvider, ProviderOptions,
    StatusReport,
};
use crate::error::{ProviderError, ProviderResult};

const PROVIDER: &str = "sora";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "sora-2";

const SUPPORTED_RATIOS: &[AspectRatio] = &[
    AspectRatio::LANDSCAPE,
    AspectRatio::PORTRAIT,
    AspectRatio::SQUARE,
];

/// Adapter for the OpenAI video generation API.
pub struct SoraProvider {
    http: Client,
    base_url: String,
    mock_fallback: bool,
}

#[derive(Debug, Serialize)]
struct CreateVideoRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seconds: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    status: String,
    #[serde(default)]
    progress: Option<u8>,
    #[serde(default)]
    error: Option<VideoError>,
}

#[derive(Debug, Deserialize)]
struct VideoError {
    message: String,
}

impl SoraProvider {
    /// Create a new Sora adapter.
    pub fn new(options: &ProviderOptions) -> Self {
        Self {
            http: options.http.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
            mock_fallback: options.mock_fallback,
        }
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Map an aspect ratio to the API's pixel-size string.
    fn size_for(ratio: AspectRatio) -> String {
        match ratio {
            AspectRatio::PORTRAIT => "720x1280".to_string(),
            AspectRatio::SQUARE => "1024x1024".to_string(),
            _ => "1280x720".to_string(),
        }
    }

    fn map_status(&self, video: &VideoResource) -> StatusReport {
        match video.status.as_str() {
            "queued" => StatusReport::queued(),
            "in_progress" => StatusReport::processing(video.progress),
            "completed" => StatusReport::completed(format!(
                "{}/v1/videos/{}/content",
                self.base_url, video.id
            )),
            "failed" => StatusReport::failed(
                video
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "generation failed".to_string()),
            ),
            other => StatusReport::failed(format!("unexpected status '{}'", other)),
        }
    }
}

#[async_trait]
impl GenerationProvider for SoraProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Sora
    }

    fn supported_aspect_ratios(&self) -> &[AspectRatio] {
        SUPPORTED_RATIOS
    }

    fn max_duration_secs(&self) -> Option<u32> {
        Some(12)
    }

    fn model_aliases(&self) -> &[&'static str] {
        &["sora-2", "sora-2-pro"]
    }

    async fn start_generation(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> ProviderResult<String> {
        let url = format!("{}/v1/videos", self.base_url);
        let body = CreateVideoRequest {
            model: request.model.as_deref().unwrap_or(DEFAULT_MODEL),
            prompt: &request.prompt,
            size: Self::size_for(request.aspect_ratio),
            seconds: request.duration_secs.map(|d| d.to_string()),
        };

        debug!(model = body.model, "Starting Sora generation");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NOT_IMPLEMENTED {
            if self.mock_fallback {
                let id = mock_job_id(ProviderId::Sora);
                warn!(status = status.as_u16(), mock_id = %id, "Sora endpoint unavailable, using mock fallback");
                return Ok(id);
            }
            return Err(ProviderError::NotImplemented {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::vendor(PROVIDER, status.as_u16(), body));
        }

        let video: VideoResource = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        Ok(video.id)
    }

    async fn check_status(
        &self,
        external_job_id: &str,
        api_key: &str,
    ) -> ProviderResult<StatusReport> {
        if is_mock_job_id(external_job_id) {
            return Ok(mock_status_report(external_job_id, "mp4"));
        }

        let url = format!("{}/v1/videos/{}", self.base_url, external_job_id);
        let response = self.http.get(&url).bearer_auth(api_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::vendor(PROVIDER, status.as_u16(), body));
        }

        let video: VideoResource = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        Ok(self.map_status(&video))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GenerationPhase;
    use adforge_models::MediaKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerationRequest {
        GenerationRequest {
            org_id: "org-1".into(),
            campaign_id: None,
            kind: MediaKind::Video,
            provider: ProviderId::Sora,
            model: None,
            prompt: "a hummingbird in slow motion".into(),
            aspect_ratio: AspectRatio::PORTRAIT,
            duration_secs: Some(8),
            audio: None,
        }
    }

    fn provider(base_url: &str, mock_fallback: bool) -> SoraProvider {
        SoraProvider::new(&ProviderOptions {
            mock_fallback,
            ..ProviderOptions::default()
        })
        .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_start_generation_returns_vendor_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "video_abc123",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        let id = provider(&server.uri(), false)
            .start_generation(&request(), "sk-test")
            .await
            .unwrap();
        assert_eq!(id, "video_abc123");
    }

    #[tokio::test]
    async fn test_start_generation_vendor_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad size"))
            .mount(&server)
            .await;

        let err = provider(&server.uri(), false)
            .start_generation(&request(), "sk-test")
            .await
            .unwrap_err();
        match err {
            ProviderError::Vendor { status, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad size");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_start_generation_404_without_fallback_is_not_implemented() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = provider(&server.uri(), false)
            .start_generation(&request(), "sk-test")
            .await
            .unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[tokio::test]
    async fn test_start_generation_404_with_fallback_mints_mock_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/videos"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let id = provider(&server.uri(), true)
            .start_generation(&request(), "sk-test")
            .await
            .unwrap();
        assert!(id.starts_with("sora-mock-"));
    }

    #[tokio::test]
    async fn test_check_status_mock_id_short_circuits() {
        // Point at an unreachable base URL: a mock id must not hit the network.
        let p = provider("http://127.0.0.1:1", false);
        let report = p.check_status("sora-mock-xyz", "sk-test").await.unwrap();
        assert_eq!(report.phase, GenerationPhase::Completed);
        assert!(report.result_url.is_some());
    }

    #[tokio::test]
    async fn test_check_status_completed_builds_content_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/videos/video_abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "video_abc123",
                "status": "completed"
            })))
            .mount(&server)
            .await;

        let report = provider(&server.uri(), false)
            .check_status("video_abc123", "sk-test")
            .await
            .unwrap();
        assert_eq!(report.phase, GenerationPhase::Completed);
        assert_eq!(
            report.result_url.unwrap(),
            format!("{}/v1/videos/video_abc123/content", server.uri())
        );
    }

    #[tokio::test]
    async fn test_check_status_failed_reports_vendor_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/videos/video_bad"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "video_bad",
                "status": "failed",
                "error": {"message": "content policy violation"}
            })))
            .mount(&server)
            .await;

        let report = provider(&server.uri(), false)
            .check_status("video_bad", "sk-test")
            .await
            .unwrap();
        assert_eq!(report.phase, GenerationPhase::Failed);
        assert_eq!(report.error.as_deref(), Some("content policy violation"));
    }
}
