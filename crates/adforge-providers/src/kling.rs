//! Kling video generation adapter.
//!
//! Kling wraps its payloads in a `{code, message, data}` envelope; a non-zero
//! `code` is a vendor-level failure even when HTTP reports 200.

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

const PROVIDER: &str = "kling";
const DEFAULT_BASE_URL: &str = "https://api.klingai.com";
const DEFAULT_MODEL: &str = "kling-v1-6";

const SUPPORTED_RATIOS: &[AspectRatio] = &[
    AspectRatio::LANDSCAPE,
    AspectRatio::PORTRAIT,
    AspectRatio::SQUARE,
];

/// Adapter for the Kling text-to-video API.
pub struct KlingProvider {
    http: Client,
    base_url: String,
    mock_fallback: bool,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    model_name: &'a str,
    prompt: &'a str,
    aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    task_id: String,
    #[serde(default)]
    task_status: String,
    #[serde(default)]
    task_status_msg: Option<String>,
    #[serde(default)]
    task_result: Option<TaskResult>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    #[serde(default)]
    videos: Vec<TaskVideo>,
}

#[derive(Debug, Deserialize)]
struct TaskVideo {
    url: String,
}

impl KlingProvider {
    /// Create a new Kling adapter.
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

    fn unwrap_envelope<T>(envelope: Envelope<T>) -> ProviderResult<T> {
        if envelope.code != 0 {
            return Err(ProviderError::invalid_response(
                PROVIDER,
                format!("code {}: {}", envelope.code, envelope.message),
            ));
        }
        envelope
            .data
            .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "missing data field"))
    }

    fn map_task(data: &TaskData) -> StatusReport {
        match data.task_status.as_str() {
            "submitted" => StatusReport::queued(),
            "processing" => StatusReport::processing(None),
            "succeed" => {
                let url = data
                    .task_result
                    .as_ref()
                    .and_then(|r| r.videos.first())
                    .map(|v| v.url.clone());
                match url {
                    Some(url) => StatusReport::completed(url),
                    None => StatusReport::failed("task succeeded with no video"),
                }
            }
            "failed" => StatusReport::failed(
                data.task_status_msg
                    .clone()
                    .unwrap_or_else(|| "generation failed".to_string()),
            ),
            other => StatusReport::failed(format!("unexpected status '{}'", other)),
        }
    }
}

#[async_trait]
impl GenerationProvider for KlingProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Kling
    }

    fn supported_aspect_ratios(&self) -> &[AspectRatio] {
        SUPPORTED_RATIOS
    }

    fn max_duration_secs(&self) -> Option<u32> {
        Some(10)
    }

    fn model_aliases(&self) -> &[&'static str] {
        &["kling-v1-6", "kling-v2-master"]
    }

    async fn start_generation(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> ProviderResult<String> {
        let url = format!("{}/v1/videos/text2video", self.base_url);
        let body = CreateTaskRequest {
            model_name: request.model.as_deref().unwrap_or(DEFAULT_MODEL),
            prompt: &request.prompt,
            aspect_ratio: request.aspect_ratio.to_string(),
            duration: request.duration_secs.map(|d| d.to_string()),
        };

        debug!(model = body.model_name, "Starting Kling generation");

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
                let id = mock_job_id(ProviderId::Kling);
                warn!(status = status.as_u16(), mock_id = %id, "Kling endpoint unavailable, using mock fallback");
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

        let envelope: Envelope<TaskData> = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        Ok(Self::unwrap_envelope(envelope)?.task_id)
    }

    async fn check_status(
        &self,
        external_job_id: &str,
        api_key: &str,
    ) -> ProviderResult<StatusReport> {
        if is_mock_job_id(external_job_id) {
            return Ok(mock_status_report(external_job_id, "mp4"));
        }

        let url = format!("{}/v1/videos/text2video/{}", self.base_url, external_job_id);
        let response = self.http.get(&url).bearer_auth(api_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::vendor(PROVIDER, status.as_u16(), body));
        }

        let envelope: Envelope<TaskData> = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        Ok(Self::map_task(&Self::unwrap_envelope(envelope)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GenerationPhase;

    #[test]
    fn test_envelope_nonzero_code_is_error() {
        let envelope: Envelope<TaskData> = serde_json::from_value(serde_json::json!({
            "code": 1102,
            "message": "account balance not enough"
        }))
        .unwrap();
        let err = KlingProvider::unwrap_envelope(envelope).unwrap_err();
        assert!(err.to_string().contains("1102"));
    }

    #[test]
    fn test_map_task_succeed() {
        let data: TaskData = serde_json::from_value(serde_json::json!({
            "task_id": "t1",
            "task_status": "succeed",
            "task_result": {"videos": [{"url": "https://cdn.kling.dev/t1.mp4"}]}
        }))
        .unwrap();
        let report = KlingProvider::map_task(&data);
        assert_eq!(report.phase, GenerationPhase::Completed);
        assert_eq!(report.result_url.as_deref(), Some("https://cdn.kling.dev/t1.mp4"));
    }

    #[test]
    fn test_map_task_failed_uses_status_msg() {
        let data: TaskData = serde_json::from_value(serde_json::json!({
            "task_id": "t1",
            "task_status": "failed",
            "task_status_msg": "risk control rejected"
        }))
        .unwrap();
        let report = KlingProvider::map_task(&data);
        assert_eq!(report.phase, GenerationPhase::Failed);
        assert_eq!(report.error.as_deref(), Some("risk control rejected"));
    }
}
