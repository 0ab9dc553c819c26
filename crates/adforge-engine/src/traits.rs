//! Collaborator seams the orchestrator is written against.
//!
//! Production wires the PostgREST repository, the R2 persister, and the
//! key resolver in; tests substitute mocks.

use async_trait::async_trait;

use adforge_models::{GenerationJob, JobId, JobStatus, MediaKind, ProviderId};
use adforge_store::{GenerationRepository, JobUpdate, StoreResult};
use adforge_storage::{AssetPersister, StorageResult};

use crate::error::EngineResult;

/// Persistence operations the orchestrator needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: &GenerationJob) -> StoreResult<GenerationJob>;

    async fn get(&self, kind: MediaKind, id: &JobId) -> StoreResult<Option<GenerationJob>>;

    /// Conditional transition out of `from`; `None` means a lost race.
    async fn transition(
        &self,
        kind: MediaKind,
        id: &JobId,
        from: JobStatus,
        update: JobUpdate,
    ) -> StoreResult<Option<GenerationJob>>;

    /// Unconditional bookkeeping update.
    async fn update(
        &self,
        kind: MediaKind,
        id: &JobId,
        update: JobUpdate,
    ) -> StoreResult<Option<GenerationJob>>;

    async fn list_active(&self, kind: MediaKind, limit: u32) -> StoreResult<Vec<GenerationJob>>;

    async fn list_by_org(
        &self,
        kind: MediaKind,
        org_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<GenerationJob>>;

    async fn delete(&self, kind: MediaKind, id: &JobId) -> StoreResult<bool>;
}

#[async_trait]
impl JobStore for GenerationRepository {
    async fn insert(&self, job: &GenerationJob) -> StoreResult<GenerationJob> {
        GenerationRepository::insert(self, job).await
    }

    async fn get(&self, kind: MediaKind, id: &JobId) -> StoreResult<Option<GenerationJob>> {
        GenerationRepository::get(self, kind, id).await
    }

    async fn transition(
        &self,
        kind: MediaKind,
        id: &JobId,
        from: JobStatus,
        update: JobUpdate,
    ) -> StoreResult<Option<GenerationJob>> {
        GenerationRepository::transition(self, kind, id, from, update).await
    }

    async fn update(
        &self,
        kind: MediaKind,
        id: &JobId,
        update: JobUpdate,
    ) -> StoreResult<Option<GenerationJob>> {
        GenerationRepository::update(self, kind, id, update).await
    }

    async fn list_active(&self, kind: MediaKind, limit: u32) -> StoreResult<Vec<GenerationJob>> {
        GenerationRepository::list_active(self, kind, limit).await
    }

    async fn list_by_org(
        &self,
        kind: MediaKind,
        org_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<GenerationJob>> {
        GenerationRepository::list_by_org(self, kind, org_id, limit).await
    }

    async fn delete(&self, kind: MediaKind, id: &JobId) -> StoreResult<bool> {
        GenerationRepository::delete(self, kind, id).await
    }
}

/// Durable storage for finished results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetSink: Send + Sync {
    /// Copy the vendor-hosted result somewhere durable, returning its URL.
    async fn persist(&self, job: &GenerationJob, source_url: &str) -> StorageResult<String>;
}

#[async_trait]
impl AssetSink for AssetPersister {
    async fn persist(&self, job: &GenerationJob, source_url: &str) -> StorageResult<String> {
        self.persist_job_result(job, source_url).await
    }
}

/// Vendor API key lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// The key to authenticate `org_id` against `provider`.
    async fn resolve(&self, org_id: &str, provider: ProviderId) -> EngineResult<String>;
}
