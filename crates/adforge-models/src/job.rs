//! Generation job definitions and lifecycle status.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::media::{AspectRatio, AudioConfig};
use crate::provider::ProviderId;
use crate::request::GenerationRequest;

/// Unique identifier for a generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generation job status.
///
/// Transitions are monotonic: `queued -> processing -> {completed|failed}`,
/// plus `queued -> failed` when the initial vendor call fails. A job never
/// returns to `queued` after entering `processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job row exists but the vendor has not accepted it yet
    #[default]
    Queued,
    /// Vendor accepted the job and assigned an external id
    Processing,
    /// Result produced and stored
    Completed,
    /// Terminal failure (vendor-reported, creation failure, or retry ceiling)
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of asset a job produces. Selects the backing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    #[default]
    Video,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }

    /// Backing table for this kind of job.
    pub fn table(&self) -> &'static str {
        match self {
            MediaKind::Video => "video_generations",
            MediaKind::Image => "image_generations",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One attempt to produce an ad creative via a third-party vendor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationJob {
    /// Unique job ID
    pub id: JobId,

    /// Owning organization
    pub org_id: String,

    /// Campaign grouping (informational, not ownership)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,

    /// Asset kind
    #[serde(default)]
    pub kind: MediaKind,

    /// Vendor integration
    pub provider: ProviderId,

    /// Vendor model name, if the caller pinned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Free-text generation prompt
    pub prompt: String,

    /// Target aspect ratio
    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Clip duration in seconds (video only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,

    /// Audio configuration (video only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioConfig>,

    /// Lifecycle status
    #[serde(default)]
    pub status: JobStatus,

    /// Vendor-assigned job id, set once the start call succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_job_id: Option<String>,

    /// Result URL (durable storage URL, or the vendor URL as a fallback)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,

    /// Thumbnail URL, when the vendor provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Vendor-reported progress (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Consecutive transient polling failures
    #[serde(default)]
    pub retry_count: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Completion timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Create a queued job row from an accepted request.
    pub fn from_request(request: &GenerationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            org_id: request.org_id.clone(),
            campaign_id: request.campaign_id.clone(),
            kind: request.kind,
            provider: request.provider,
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            aspect_ratio: request.aspect_ratio,
            duration_secs: request.duration_secs,
            audio: request.audio.clone(),
            status: JobStatus::Queued,
            external_job_id: None,
            result_url: None,
            thumbnail_url: None,
            error_message: None,
            progress: 0,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mark the vendor start call as accepted.
    pub fn start(mut self, external_job_id: impl Into<String>) -> Self {
        self.status = JobStatus::Processing;
        self.external_job_id = Some(external_job_id.into());
        self.updated_at = Utc::now();
        self
    }

    /// Mark job as completed with a result URL.
    pub fn complete(mut self, result_url: impl Into<String>) -> Self {
        self.status = JobStatus::Completed;
        self.result_url = Some(result_url.into());
        self.progress = 100;
        self.retry_count = 0;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Mark job as failed.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            org_id: "org-1".into(),
            campaign_id: Some("camp-1".into()),
            kind: MediaKind::Video,
            provider: ProviderId::Sora,
            model: None,
            prompt: "a dog surfing at sunset".into(),
            aspect_ratio: AspectRatio::PORTRAIT,
            duration_secs: Some(8),
            audio: None,
        }
    }

    #[test]
    fn test_job_creation() {
        let job = GenerationJob::from_request(&request());
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.provider, ProviderId::Sora);
        assert!(job.external_job_id.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_job_state_transitions() {
        let job = GenerationJob::from_request(&request());

        let started = job.start("ext-abc");
        assert_eq!(started.status, JobStatus::Processing);
        assert_eq!(started.external_job_id.as_deref(), Some("ext-abc"));

        let completed = started.complete("https://cdn.example.com/x.mp4");
        assert_eq!(completed.status, JobStatus::Completed);
        assert_eq!(completed.progress, 100);
        assert_eq!(completed.retry_count, 0);
        assert!(completed.is_terminal());
        assert!(completed.completed_at.is_some());
    }

    #[test]
    fn test_job_failure() {
        let job = GenerationJob::from_request(&request());
        let failed = job.fail("vendor rejected prompt");
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.is_terminal());
        assert_eq!(failed.error_message.as_deref(), Some("vendor rejected prompt"));
    }

    #[test]
    fn test_media_kind_table() {
        assert_eq!(MediaKind::Video.table(), "video_generations");
        assert_eq!(MediaKind::Image.table(), "image_generations");
    }
}
