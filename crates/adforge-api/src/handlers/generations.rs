//! Generation job handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use adforge_models::{GenerationJob, GenerationRequest, JobId, JobStatus, MediaKind};

use crate::error::ApiResult;
use crate::state::AppState;

/// Query selecting the job table. Defaults to video.
#[derive(Debug, Deserialize)]
pub struct KindQuery {
    #[serde(default)]
    pub kind: MediaKind,
}

/// Query for org job listings.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub org_id: String,
    #[serde(default)]
    pub kind: MediaKind,
}

#[derive(Serialize)]
pub struct GenerationListResponse {
    pub jobs: Vec<GenerationJob>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct CreateGenerationResponse {
    pub success: bool,
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Create a generation job and kick off the vendor call.
pub async fn create_generation(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<(StatusCode, Json<CreateGenerationResponse>)> {
    let job = state.orchestrator.create_job(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateGenerationResponse {
            success: true,
            job_id: job.id,
            status: job.status,
        }),
    ))
}

/// Poll the vendor for a job's current status and persist any advance.
pub async fn poll_generation(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<KindQuery>,
) -> ApiResult<Json<GenerationJob>> {
    let job = state
        .orchestrator
        .poll_job(query.kind, &JobId::from(job_id))
        .await?;
    Ok(Json(job))
}

/// Fetch a job without touching the vendor.
pub async fn get_generation(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<KindQuery>,
) -> ApiResult<Json<GenerationJob>> {
    let job = state
        .orchestrator
        .get_job(query.kind, &JobId::from(job_id))
        .await?;
    Ok(Json(job))
}

/// List an organization's jobs, newest first.
pub async fn list_generations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<GenerationListResponse>> {
    let jobs = state
        .orchestrator
        .list_jobs(query.kind, &query.org_id)
        .await?;
    let count = jobs.len();
    Ok(Json(GenerationListResponse { jobs, count }))
}

/// Delete a job row. Image generations only; pass `?kind=image`.
pub async fn delete_generation(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<KindQuery>,
) -> ApiResult<StatusCode> {
    state
        .orchestrator
        .delete_job(query.kind, &JobId::from(job_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
