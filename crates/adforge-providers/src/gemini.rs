//! Gemini image generation adapter.
//!
//! Image generation runs as a long-running operation like Veo; the completed
//! operation carries hosted prediction URLs rather than inline bytes.

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

const PROVIDER: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "imagen-3.0-generate-002";

const SUPPORTED_RATIOS: &[AspectRatio] = &[
    AspectRatio::LANDSCAPE,
    AspectRatio::PORTRAIT,
    AspectRatio::SQUARE,
    AspectRatio::FEED_PORTRAIT,
];

/// Adapter for Gemini-family image generation.
pub struct GeminiImageProvider {
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
    #[serde(rename = "sampleCount")]
    sample_count: u32,
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
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    url: Option<String>,
}

impl GeminiImageProvider {
    /// Create a new Gemini image adapter.
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

        let url = op
            .response
            .as_ref()
            .and_then(|r| r.predictions.first())
            .and_then(|p| p.url.clone());

        match url {
            Some(url) => StatusReport::completed(url),
            None => StatusReport::failed("operation done with no prediction"),
        }
    }
}

#[async_trait]
impl GenerationProvider for GeminiImageProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn supported_aspect_ratios(&self) -> &[AspectRatio] {
        SUPPORTED_RATIOS
    }

    fn max_duration_secs(&self) -> Option<u32> {
        None
    }

    fn model_aliases(&self) -> &[&'static str] {
        &["imagen-3.0-generate-002", "gemini-2.5-flash-image"]
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
                sample_count: 1,
            },
        };

        debug!(model, "Starting Gemini image generation");

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
                let id = mock_job_id(ProviderId::Gemini);
                warn!(status = status.as_u16(), mock_id = %id, "Gemini endpoint unavailable, using mock fallback");
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

        Ok(op.name)
    }

    async fn check_status(
        &self,
        external_job_id: &str,
        api_key: &str,
    ) -> ProviderResult<StatusReport> {
        if is_mock_job_id(external_job_id) {
            return Ok(mock_status_report(external_job_id, "png"));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GenerationPhase;

    #[test]
    fn test_no_max_duration_for_images() {
        let p = GeminiImageProvider::new(&ProviderOptions::default());
        assert!(p.max_duration_secs().is_none());
    }

    #[test]
    fn test_map_operation_done_with_prediction() {
        let op: Operation = serde_json::from_value(serde_json::json!({
            "name": "models/imagen-3.0/operations/op1",
            "done": true,
            "response": {"predictions": [{"url": "https://img.vendor.dev/op1.png"}]}
        }))
        .unwrap();
        let report = GeminiImageProvider::map_operation(&op);
        assert_eq!(report.phase, GenerationPhase::Completed);
        assert_eq!(report.result_url.as_deref(), Some("https://img.vendor.dev/op1.png"));
    }
}
