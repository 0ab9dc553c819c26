//! Runway video generation adapter.

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

const PROVIDER: &str = "runway";
const DEFAULT_BASE_URL: &str = "https://api.dev.runwayml.com";
const DEFAULT_MODEL: &str = "gen4_turbo";
const API_VERSION: &str = "2024-11-06";

const SUPPORTED_RATIOS: &[AspectRatio] = &[AspectRatio::LANDSCAPE, AspectRatio::PORTRAIT];

/// Adapter for the Runway task API.
pub struct RunwayProvider {
    http: Client,
    base_url: String,
    mock_fallback: bool,
}

#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    model: &'a str,
    #[serde(rename = "promptText")]
    prompt_text: &'a str,
    ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TaskCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Task {
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    output: Vec<String>,
    #[serde(default)]
    failure: Option<String>,
}

impl RunwayProvider {
    /// Create a new Runway adapter.
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

    /// Runway expresses ratios as output pixel dimensions.
    fn ratio_for(ratio: AspectRatio) -> String {
        match ratio {
            AspectRatio::PORTRAIT => "720:1280".to_string(),
            _ => "1280:720".to_string(),
        }
    }

    fn map_task(task: &Task) -> StatusReport {
        match task.status.as_str() {
            "PENDING" | "THROTTLED" => StatusReport::queued(),
            "RUNNING" => {
                StatusReport::processing(task.progress.map(|p| (p * 100.0).round() as u8))
            }
            "SUCCEEDED" => match task.output.first() {
                Some(url) => StatusReport::completed(url.clone()),
                None => StatusReport::failed("task succeeded with empty output"),
            },
            "FAILED" | "CANCELLED" => StatusReport::failed(
                task.failure
                    .clone()
                    .unwrap_or_else(|| "generation failed".to_string()),
            ),
            other => StatusReport::failed(format!("unexpected status '{}'", other)),
        }
    }
}

#[async_trait]
impl GenerationProvider for RunwayProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Runway
    }

    fn supported_aspect_ratios(&self) -> &[AspectRatio] {
        SUPPORTED_RATIOS
    }

    fn max_duration_secs(&self) -> Option<u32> {
        Some(10)
    }

    fn model_aliases(&self) -> &[&'static str] {
        &["gen4_turbo", "gen3a_turbo"]
    }

    async fn start_generation(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> ProviderResult<String> {
        let url = format!("{}/v1/text_to_video", self.base_url);
        let body = CreateTaskRequest {
            model: request.model.as_deref().unwrap_or(DEFAULT_MODEL),
            prompt_text: &request.prompt,
            ratio: Self::ratio_for(request.aspect_ratio),
            duration: request.duration_secs,
        };

        debug!(model = body.model, "Starting Runway generation");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header("X-Runway-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::NOT_IMPLEMENTED {
            if self.mock_fallback {
                let id = mock_job_id(ProviderId::Runway);
                warn!(status = status.as_u16(), mock_id = %id, "Runway endpoint unavailable, using mock fallback");
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

        let task: TaskCreated = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        Ok(task.id)
    }

    async fn check_status(
        &self,
        external_job_id: &str,
        api_key: &str,
    ) -> ProviderResult<StatusReport> {
        if is_mock_job_id(external_job_id) {
            return Ok(mock_status_report(external_job_id, "mp4"));
        }

        let url = format!("{}/v1/tasks/{}", self.base_url, external_job_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .header("X-Runway-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::vendor(PROVIDER, status.as_u16(), body));
        }

        let task: Task = response
            .json()
            .await
            .map_err(|e| ProviderError::invalid_response(PROVIDER, e.to_string()))?;

        Ok(Self::map_task(&task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GenerationPhase;

    fn task(json: serde_json::Value) -> Task {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_map_task_running_progress() {
        let report = RunwayProvider::map_task(&task(serde_json::json!({
            "status": "RUNNING",
            "progress": 0.42
        })));
        assert_eq!(report.phase, GenerationPhase::Processing);
        assert_eq!(report.progress, Some(42));
    }

    #[test]
    fn test_map_task_succeeded() {
        let report = RunwayProvider::map_task(&task(serde_json::json!({
            "status": "SUCCEEDED",
            "output": ["https://cdn.runway.dev/task1.mp4"]
        })));
        assert_eq!(report.phase, GenerationPhase::Completed);
        assert_eq!(report.result_url.as_deref(), Some("https://cdn.runway.dev/task1.mp4"));
    }

    #[test]
    fn test_map_task_failed() {
        let report = RunwayProvider::map_task(&task(serde_json::json!({
            "status": "FAILED",
            "failure": "safety filter triggered"
        })));
        assert_eq!(report.phase, GenerationPhase::Failed);
        assert_eq!(report.error.as_deref(), Some("safety filter triggered"));
    }

    #[test]
    fn test_ratio_mapping() {
        assert_eq!(RunwayProvider::ratio_for(AspectRatio::PORTRAIT), "720:1280");
        assert_eq!(RunwayProvider::ratio_for(AspectRatio::LANDSCAPE), "1280:720");
    }
}
