//! Generation job orchestration.
//!
//! Owns the job lifecycle: `queued -> processing -> {completed|failed}`.
//! All status writes that move a job between states go through conditional
//! transitions, so concurrent pollers cannot double-apply a terminal state.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};
use validator::Validate;

use adforge_models::{
    GenerationJob, GenerationRequest, JobId, JobStatus, MediaKind,
};
use adforge_providers::{GenerationPhase, ProviderError, ProviderRegistry, StatusReport};
use adforge_store::JobUpdate;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::traits::{AssetSink, JobStore, KeyResolver};

mod metric_names {
    pub const JOBS_CREATED: &str = "generation_jobs_created_total";
    pub const JOBS_COMPLETED: &str = "generation_jobs_completed_total";
    pub const JOBS_FAILED: &str = "generation_jobs_failed_total";
    pub const POLL_RETRIES: &str = "generation_poll_retries_total";
}

/// Drives generation jobs through their lifecycle.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn JobStore>,
    assets: Arc<dyn AssetSink>,
    keys: Arc<dyn KeyResolver>,
    config: EngineConfig,
}

impl Orchestrator {
    /// Wire up an orchestrator.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn JobStore>,
        assets: Arc<dyn AssetSink>,
        keys: Arc<dyn KeyResolver>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            store,
            assets,
            keys,
            config,
        }
    }

    /// Accept a generation request: persist the job, kick off the vendor
    /// call, and record the outcome.
    ///
    /// A rejected vendor start marks the row `failed` and then surfaces
    /// the vendor error to the caller.
    pub async fn create_job(&self, request: &GenerationRequest) -> EngineResult<GenerationJob> {
        request
            .validate()
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let provider = self.registry.get(request.provider)?;

        if !provider
            .supported_aspect_ratios()
            .contains(&request.aspect_ratio)
        {
            return Err(EngineError::validation(format!(
                "provider '{}' does not support aspect ratio {}",
                request.provider, request.aspect_ratio
            )));
        }
        if let (Some(duration), Some(max)) = (request.duration_secs, provider.max_duration_secs()) {
            if duration > max {
                return Err(EngineError::validation(format!(
                    "provider '{}' supports at most {}s, got {}s",
                    request.provider, max, duration
                )));
            }
        }
        // A pinned model must not belong to a different adapter. Names the
        // registry has never heard of are forwarded to the vendor as-is.
        if let Some(model) = request.model.as_deref() {
            if let Ok(owner) = self.registry.resolve(model) {
                if owner.id() != request.provider {
                    return Err(EngineError::validation(format!(
                        "model '{}' belongs to provider '{}', not '{}'",
                        model,
                        owner.id(),
                        request.provider
                    )));
                }
            }
        }

        let api_key = self.keys.resolve(&request.org_id, request.provider).await?;

        let job = self.store.insert(&GenerationJob::from_request(request)).await?;
        counter!(metric_names::JOBS_CREATED, "provider" => request.provider.as_str())
            .increment(1);

        match provider.start_generation(request, &api_key).await {
            Ok(external_job_id) => {
                info!(job_id = %job.id, external_job_id, "Vendor accepted generation");
                let update = JobUpdate::new()
                    .status(JobStatus::Processing)
                    .external_job_id(external_job_id);
                match self
                    .store
                    .transition(job.kind, &job.id, JobStatus::Queued, update)
                    .await?
                {
                    Some(updated) => Ok(updated),
                    None => self.reload(job.kind, &job.id).await,
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(job_id = %job.id, error = %message, "Vendor rejected generation");
                self.fail_job(job.kind, &job.id, JobStatus::Queued, &message)
                    .await?;
                Err(e.into())
            }
        }
    }

    /// Poll the vendor for a job and advance its state.
    ///
    /// Terminal jobs are returned untouched. Transient vendor errors bump
    /// `retry_count`; at the configured ceiling the job fails outright.
    pub async fn poll_job(&self, kind: MediaKind, id: &JobId) -> EngineResult<GenerationJob> {
        let job = self
            .store
            .get(kind, id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))?;

        if job.is_terminal() {
            debug!(job_id = %job.id, status = %job.status, "Skipping poll of terminal job");
            return Ok(job);
        }

        // A queued job without an external id never reached the vendor;
        // nothing to poll yet.
        let Some(external_job_id) = job.external_job_id.clone() else {
            return Ok(job);
        };

        let provider = self.registry.get(job.provider)?;
        let api_key = self.keys.resolve(&job.org_id, job.provider).await?;

        match provider.check_status(&external_job_id, &api_key).await {
            Ok(report) => self.apply_report(job, report).await,
            Err(e) => self.record_poll_failure(job, e).await,
        }
    }

    /// Fetch a single job.
    pub async fn get_job(&self, kind: MediaKind, id: &JobId) -> EngineResult<GenerationJob> {
        self.store
            .get(kind, id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))
    }

    /// List an organization's jobs, newest first.
    pub async fn list_jobs(
        &self,
        kind: MediaKind,
        org_id: &str,
    ) -> EngineResult<Vec<GenerationJob>> {
        Ok(self
            .store
            .list_by_org(kind, org_id, self.config.list_limit)
            .await?)
    }

    /// Non-terminal jobs for the background poller.
    pub async fn list_active(
        &self,
        kind: MediaKind,
        limit: u32,
    ) -> EngineResult<Vec<GenerationJob>> {
        Ok(self.store.list_active(kind, limit).await?)
    }

    /// Delete a job row. Only image generations can be deleted; video rows
    /// are retained for billing reconciliation.
    pub async fn delete_job(&self, kind: MediaKind, id: &JobId) -> EngineResult<()> {
        if kind != MediaKind::Image {
            return Err(EngineError::validation(
                "only image generations can be deleted",
            ));
        }
        if self.store.delete(kind, id).await? {
            info!(job_id = %id, "Deleted image generation");
            Ok(())
        } else {
            Err(EngineError::JobNotFound(id.clone()))
        }
    }

    async fn apply_report(
        &self,
        job: GenerationJob,
        report: StatusReport,
    ) -> EngineResult<GenerationJob> {
        match report.phase {
            GenerationPhase::Completed => match report.result_url {
                Some(vendor_url) => self.complete_job(job, vendor_url, report.thumbnail_url).await,
                None => {
                    let failed = self
                        .fail_job(
                            job.kind,
                            &job.id,
                            job.status,
                            "vendor reported completion without a result url",
                        )
                        .await?;
                    match failed {
                        Some(updated) => Ok(updated),
                        None => self.reload(job.kind, &job.id).await,
                    }
                }
            },
            GenerationPhase::Failed => {
                let message = report
                    .error
                    .unwrap_or_else(|| "generation failed".to_string());
                let failed = self
                    .fail_job(job.kind, &job.id, job.status, &message)
                    .await?;
                match failed {
                    Some(updated) => Ok(updated),
                    None => self.reload(job.kind, &job.id).await,
                }
            }
            GenerationPhase::Queued | GenerationPhase::Processing => {
                // Successful poll resets the transient failure streak.
                let mut update = JobUpdate::new().retry_count(0);
                if let Some(progress) = report.progress {
                    update = update.progress(progress);
                }
                let updated = self.store.update(job.kind, &job.id, update).await?;
                Ok(updated.unwrap_or(job))
            }
        }
    }

    async fn complete_job(
        &self,
        job: GenerationJob,
        vendor_url: String,
        thumbnail_url: Option<String>,
    ) -> EngineResult<GenerationJob> {
        // Vendor URLs expire; prefer a durable copy but never lose the
        // result over a storage hiccup.
        let result_url = match self.assets.persist(&job, &vendor_url).await {
            Ok(durable) => durable,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Asset persistence failed, keeping vendor URL");
                vendor_url
            }
        };

        let mut update = JobUpdate::new()
            .status(JobStatus::Completed)
            .result_url(result_url)
            .progress(100)
            .retry_count(0)
            .completed_now();
        if let Some(thumb) = thumbnail_url {
            update = update.thumbnail_url(thumb);
        }

        match self
            .store
            .transition(job.kind, &job.id, job.status, update)
            .await?
        {
            Some(updated) => {
                info!(job_id = %updated.id, provider = %updated.provider, "Generation completed");
                counter!(metric_names::JOBS_COMPLETED, "provider" => updated.provider.as_str())
                    .increment(1);
                Ok(updated)
            }
            None => self.reload(job.kind, &job.id).await,
        }
    }

    async fn record_poll_failure(
        &self,
        job: GenerationJob,
        error: ProviderError,
    ) -> EngineResult<GenerationJob> {
        let attempts = job.retry_count + 1;
        counter!(metric_names::POLL_RETRIES, "provider" => job.provider.as_str()).increment(1);

        if attempts >= self.config.poll_retry_limit {
            let message = format!(
                "giving up after {} transient poll failures: {}",
                attempts, error
            );
            warn!(job_id = %job.id, attempts, "Poll retry ceiling reached");
            let failed = self
                .fail_job(job.kind, &job.id, job.status, &message)
                .await?;
            return match failed {
                Some(updated) => Ok(updated),
                None => self.reload(job.kind, &job.id).await,
            };
        }

        debug!(job_id = %job.id, attempts, error = %error, "Transient poll failure");
        let updated = self
            .store
            .update(job.kind, &job.id, JobUpdate::new().retry_count(attempts))
            .await?;
        Ok(updated.unwrap_or_else(|| {
            let mut job = job;
            job.retry_count = attempts;
            job
        }))
    }

    async fn fail_job(
        &self,
        kind: MediaKind,
        id: &JobId,
        from: JobStatus,
        message: &str,
    ) -> EngineResult<Option<GenerationJob>> {
        let update = JobUpdate::new()
            .status(JobStatus::Failed)
            .error_message(message);
        let failed = self.store.transition(kind, id, from, update).await?;
        if let Some(job) = &failed {
            counter!(metric_names::JOBS_FAILED, "provider" => job.provider.as_str()).increment(1);
        }
        Ok(failed)
    }

    /// Current row after a lost transition race.
    async fn reload(&self, kind: MediaKind, id: &JobId) -> EngineResult<GenerationJob> {
        self.store
            .get(kind, id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(id.clone()))
    }
}
