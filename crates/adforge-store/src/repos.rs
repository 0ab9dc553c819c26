//! Typed repositories over the generation tables.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use adforge_models::{GenerationJob, JobId, JobStatus, MediaKind, ProviderId};

use crate::client::PostgrestClient;
use crate::error::StoreResult;

/// Partial update applied to a job row. Unset fields are left untouched.
#[derive(Debug, Clone, Serialize)]
pub struct JobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl JobUpdate {
    /// Empty update stamped with the current time.
    pub fn new() -> Self {
        Self {
            status: None,
            external_job_id: None,
            result_url: None,
            thumbnail_url: None,
            error_message: None,
            progress: None,
            retry_count: None,
            completed_at: None,
            updated_at: Utc::now(),
        }
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn external_job_id(mut self, id: impl Into<String>) -> Self {
        self.external_job_id = Some(id.into());
        self
    }

    pub fn result_url(mut self, url: impl Into<String>) -> Self {
        self.result_url = Some(url.into());
        self
    }

    pub fn thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn completed_now(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }
}

impl Default for JobUpdate {
    fn default() -> Self {
        Self::new()
    }
}

/// Repository for generation job rows.
///
/// Video and image jobs live in separate tables; every method takes the
/// [`MediaKind`] that picks the table.
#[derive(Clone)]
pub struct GenerationRepository {
    client: PostgrestClient,
}

impl GenerationRepository {
    /// Create a new repository.
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }

    /// Insert a freshly created job row.
    pub async fn insert(&self, job: &GenerationJob) -> StoreResult<GenerationJob> {
        let stored: GenerationJob = self.client.insert(job.kind.table(), job).await?;
        info!(job_id = %stored.id, provider = %stored.provider, "Created generation job");
        Ok(stored)
    }

    /// Get a job by id.
    pub async fn get(&self, kind: MediaKind, id: &JobId) -> StoreResult<Option<GenerationJob>> {
        self.client
            .select_one(kind.table(), &[("id", format!("eq.{}", id))])
            .await
    }

    /// Conditionally move a job out of `from`, applying `update`.
    ///
    /// Returns `None` when the row was no longer in `from`, meaning another
    /// writer won the race and this update was discarded.
    pub async fn transition(
        &self,
        kind: MediaKind,
        id: &JobId,
        from: JobStatus,
        update: JobUpdate,
    ) -> StoreResult<Option<GenerationJob>> {
        let filters = [
            ("id", format!("eq.{}", id)),
            ("status", format!("eq.{}", from)),
        ];
        let mut rows: Vec<GenerationJob> =
            self.client.update(kind.table(), &filters, &update).await?;
        Ok(rows.pop())
    }

    /// Unconditional bookkeeping update (progress, retry counters).
    pub async fn update(
        &self,
        kind: MediaKind,
        id: &JobId,
        update: JobUpdate,
    ) -> StoreResult<Option<GenerationJob>> {
        let filters = [("id", format!("eq.{}", id))];
        let mut rows: Vec<GenerationJob> =
            self.client.update(kind.table(), &filters, &update).await?;
        Ok(rows.pop())
    }

    /// Non-terminal jobs, oldest first. Feeds the background poller.
    pub async fn list_active(&self, kind: MediaKind, limit: u32) -> StoreResult<Vec<GenerationJob>> {
        self.client
            .select(
                kind.table(),
                &[
                    ("status", "in.(queued,processing)".to_string()),
                    ("order", "created_at.asc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
    }

    /// Jobs belonging to one organization, newest first.
    pub async fn list_by_org(
        &self,
        kind: MediaKind,
        org_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<GenerationJob>> {
        self.client
            .select(
                kind.table(),
                &[
                    ("org_id", format!("eq.{}", org_id)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
    }

    /// Delete a job row. Returns false when no row matched.
    pub async fn delete(&self, kind: MediaKind, id: &JobId) -> StoreResult<bool> {
        let removed = self
            .client
            .delete(kind.table(), &[("id", format!("eq.{}", id))])
            .await?;
        Ok(removed > 0)
    }
}

#[derive(Debug, serde::Deserialize)]
struct ProviderKeyRow {
    api_key: String,
}

/// Repository for per-organization vendor API keys.
#[derive(Clone)]
pub struct ProviderKeyRepository {
    client: PostgrestClient,
}

impl ProviderKeyRepository {
    const TABLE: &'static str = "org_provider_keys";

    /// Create a new repository.
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }

    /// The key an organization stored for a provider, if any.
    pub async fn get(&self, org_id: &str, provider: ProviderId) -> StoreResult<Option<String>> {
        let row: Option<ProviderKeyRow> = self
            .client
            .select_one(
                Self::TABLE,
                &[
                    ("org_id", format!("eq.{}", org_id)),
                    ("provider", format!("eq.{}", provider)),
                ],
            )
            .await?;
        Ok(row.map(|r| r.api_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{PostgrestClient, PostgrestConfig};
    use crate::retry::RetryConfig;
    use adforge_models::{AspectRatio, GenerationRequest};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> PostgrestClient {
        PostgrestClient::new(PostgrestConfig {
            base_url: base_url.to_string(),
            service_key: "service-key".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig {
                max_retries: 0,
                base_delay_ms: 1,
                max_delay_ms: 1,
            },
        })
        .unwrap()
    }

    fn job() -> GenerationJob {
        GenerationJob::from_request(&GenerationRequest {
            org_id: "org-1".into(),
            campaign_id: None,
            kind: MediaKind::Video,
            provider: ProviderId::Sora,
            model: None,
            prompt: "a fox in the snow".into(),
            aspect_ratio: AspectRatio::LANDSCAPE,
            duration_secs: Some(8),
            audio: None,
        })
    }

    #[tokio::test]
    async fn test_insert_targets_kind_table() {
        let server = MockServer::start().await;
        let job = job();
        Mock::given(method("POST"))
            .and(path("/rest/v1/video_generations"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!([serde_json::to_value(&job).unwrap()])),
            )
            .mount(&server)
            .await;

        let repo = GenerationRepository::new(client(&server.uri()));
        let stored = repo.insert(&job).await.unwrap();
        assert_eq!(stored.id, job.id);
    }

    #[tokio::test]
    async fn test_transition_filters_on_previous_status() {
        let server = MockServer::start().await;
        let stored = job().start("ext-1");
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/video_generations"))
            .and(query_param("id", format!("eq.{}", stored.id)))
            .and(query_param("status", "eq.processing"))
            .and(body_partial_json(serde_json::json!({"status": "completed"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([serde_json::to_value(&stored).unwrap()])),
            )
            .mount(&server)
            .await;

        let repo = GenerationRepository::new(client(&server.uri()));
        let result = repo
            .transition(
                MediaKind::Video,
                &stored.id,
                JobStatus::Processing,
                JobUpdate::new().status(JobStatus::Completed),
            )
            .await
            .unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_transition_lost_race_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/video_generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let repo = GenerationRepository::new(client(&server.uri()));
        let result = repo
            .transition(
                MediaKind::Video,
                &JobId::from("j1"),
                JobStatus::Processing,
                JobUpdate::new().status(JobStatus::Failed),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_active_queries_non_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/image_generations"))
            .and(query_param("status", "in.(queued,processing)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let repo = GenerationRepository::new(client(&server.uri()));
        let jobs = repo.list_active(MediaKind::Image, 50).await.unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_provider_key_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/org_provider_keys"))
            .and(query_param("org_id", "eq.org-1"))
            .and(query_param("provider", "eq.sora"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"api_key": "sk-org-key"}
            ])))
            .mount(&server)
            .await;

        let repo = ProviderKeyRepository::new(client(&server.uri()));
        let key = repo.get("org-1", ProviderId::Sora).await.unwrap();
        assert_eq!(key.as_deref(), Some("sk-org-key"));
    }
}
