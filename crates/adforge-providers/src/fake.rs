//! Deterministic in-process provider for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use adforge_models::{AspectRatio, GenerationRequest, ProviderId};

use crate::adapter::{GenerationProvider, StatusReport};
use crate::error::ProviderResult;

const SUPPORTED_RATIOS: &[AspectRatio] = &[
    AspectRatio::LANDSCAPE,
    AspectRatio::PORTRAIT,
    AspectRatio::SQUARE,
    AspectRatio::FEED_PORTRAIT,
];

/// A provider that never leaves the process.
///
/// Each started generation completes after a fixed number of status checks,
/// so lifecycle tests can walk queued, processing, and completed states
/// without any network. A failure marker in the prompt produces a failed
/// generation instead.
pub struct FakeProvider {
    polls_until_complete: u32,
    counter: AtomicU64,
    polls: Mutex<HashMap<String, u32>>,
}

impl FakeProvider {
    /// Marker substring: prompts containing it fail at the first status check.
    pub const FAIL_MARKER: &'static str = "[fake:fail]";

    /// Completes after two status checks.
    pub fn new() -> Self {
        Self::completing_after(2)
    }

    /// Completes after `polls` status checks (0 completes immediately).
    pub fn completing_after(polls: u32) -> Self {
        Self {
            polls_until_complete: polls,
            counter: AtomicU64::new(0),
            polls: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Fake
    }

    fn supported_aspect_ratios(&self) -> &[AspectRatio] {
        SUPPORTED_RATIOS
    }

    fn max_duration_secs(&self) -> Option<u32> {
        Some(60)
    }

    async fn start_generation(
        &self,
        request: &GenerationRequest,
        _api_key: &str,
    ) -> ProviderResult<String> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = if request.prompt.contains(Self::FAIL_MARKER) {
            format!("fake-fail-{n}")
        } else {
            format!("fake-{n}")
        };
        self.polls
            .lock()
            .expect("poll map poisoned")
            .insert(id.clone(), 0);
        Ok(id)
    }

    async fn check_status(
        &self,
        external_job_id: &str,
        _api_key: &str,
    ) -> ProviderResult<StatusReport> {
        if external_job_id.starts_with("fake-fail-") {
            return Ok(StatusReport::failed("simulated generation failure"));
        }

        let mut polls = self.polls.lock().expect("poll map poisoned");
        let count = polls.entry(external_job_id.to_string()).or_insert(0);
        *count += 1;

        if *count > self.polls_until_complete {
            Ok(StatusReport::completed(format!(
                "https://fake.adforge.dev/renders/{external_job_id}.mp4"
            )))
        } else {
            let progress = (*count * 100 / (self.polls_until_complete + 1)) as u8;
            Ok(StatusReport::processing(Some(progress)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GenerationPhase;
    use adforge_models::MediaKind;

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest {
            org_id: "org-1".into(),
            campaign_id: None,
            kind: MediaKind::Video,
            provider: ProviderId::Fake,
            model: None,
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::LANDSCAPE,
            duration_secs: None,
            audio: None,
        }
    }

    #[tokio::test]
    async fn test_completes_after_configured_polls() {
        let p = FakeProvider::completing_after(2);
        let id = p.start_generation(&request("a dog"), "k").await.unwrap();

        let first = p.check_status(&id, "k").await.unwrap();
        assert_eq!(first.phase, GenerationPhase::Processing);
        let second = p.check_status(&id, "k").await.unwrap();
        assert_eq!(second.phase, GenerationPhase::Processing);
        let third = p.check_status(&id, "k").await.unwrap();
        assert_eq!(third.phase, GenerationPhase::Completed);
        assert!(third.result_url.unwrap().contains(&id));
    }

    #[tokio::test]
    async fn test_fail_marker_fails_on_first_poll() {
        let p = FakeProvider::new();
        let id = p
            .start_generation(&request("a dog [fake:fail]"), "k")
            .await
            .unwrap();
        let report = p.check_status(&id, "k").await.unwrap();
        assert_eq!(report.phase, GenerationPhase::Failed);
    }

    #[tokio::test]
    async fn test_jobs_poll_independently() {
        let p = FakeProvider::completing_after(1);
        let a = p.start_generation(&request("a"), "k").await.unwrap();
        let b = p.start_generation(&request("b"), "k").await.unwrap();
        assert_ne!(a, b);

        p.check_status(&a, "k").await.unwrap();
        let a2 = p.check_status(&a, "k").await.unwrap();
        assert_eq!(a2.phase, GenerationPhase::Completed);
        let b1 = p.check_status(&b, "k").await.unwrap();
        assert_eq!(b1.phase, GenerationPhase::Processing);
    }
}
