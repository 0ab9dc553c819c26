//! Google Veo video generation adapter.
//!
//! Veo runs as a long-running operation on the Generative Language API:
//! `predictLongRunning` returns an operation name which is polled until
//! `done` is set.

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

const PROVIDER: &str = "veo";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "veo-3.1-generate-preview";

const SUPPORTED_RATIOS: &[AspectRatio] = &[AspectRatio::LANDSCAPE, AspectRatio::PORTRAIT];

/// Adapter for Veo on the Generative Language API.
pub struct VeoProvider {
    http: Client,
    base_url: String,
    mock_fallback: bool,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<Instance<'a>>,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Instance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
struct Parameters {
    #[serde(rename = "aspectRatio")]
    aspect_ratio: String,
    #[serde(rename = "durationSeconds", skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<u32>,
    #[serde(rename = "generateAudio")]
    generate_audio: bool,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    #[serde(rename = "generateVideoResponse")]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
struct GenerateVideoResponse {
    #[serde(rename = "generatedSamples", default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: String,
}

impl VeoProvider {
    /// Create a new Veo adapter.
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

    fn map_operation(op: &Operation) -> StatusReport {
        if let Some(err) = &op.error {
            return StatusReport::failed(err.message.clone());
        }
        if !op.done {
            return StatusReport::processing(None);
        }

        let uri = op
            .response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
            .and_then(|g| g.generated_samples.first())
            .and_then(|s| s.video.as_ref())
            .map(|v| v.uri.clone());

        match uri {
            Some(uri) => StatusReport::completed(uri),
            None => StatusReport::failed("operation done with no generated video"),
        }
    }
}

#[async_trait]
impl GenerationProvider for VeoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Veo
    }

    fn supported_aspect_ratios(&self) -> &[AspectRatio] {
        SUPPORTED_RATIOS
    }

    fn max_duration_secs(&self) -> Option<u32> {
        Some(8)
    }

    fn model_aliases(&self) -> &[&'static str] {
        &["veo-3.1-generate-preview", "veo-3.0-generate-001", "veo-2.0-generate-001"]
    }

    async fn start_generation(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> ProviderResult<String> {
        let model = request.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let url = format!(
            "{}/v1beta/models/{}:predictLongRunning",
            self.base_url, model
        );

        let body = PredictRequest {
            instances: vec![Instance {
                prompt: &request.prompt,
            }],
            parameters: Parameters {
                aspect_ratio: request.aspect_ratio.to_string(),
                duration_seconds: request.duration_secs,
                generate_audio: request.audio.as_ref().map(|a| a.enabled).unwrap_or(false),
            },
        };

        debug!(model, "Starting Veo generation");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NOT_IMPLEMENTED {
            if self.mock_fallback {
                let id = mock_job_id(ProviderId::Veo);
                warn!(status = status.as_u16(), mock_id = %id, "Veo endpoint unavailable, using mock fallback");
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

        let op: Operation = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        // The operation name is the external job id, e.g.
        // "models/veo-3.1-generate-preview/operations/abc123".
        Ok(op.name)
    }

    async fn check_status(
        &self,
        external_job_id: &str,
        api_key: &str,
    ) -> ProviderResult<StatusReport> {
        if is_mock_job_id(external_job_id) {
            return Ok(mock_status_report(external_job_id, "mp4"));
        }

        let url = format!("{}/v1beta/{}", self.base_url, external_job_id);
        let response = self
            .http
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::vendor(PROVIDER, status.as_u16(), body));
        }

        let op: Operation = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        Ok(Self::map_operation(&op))
    }
}
