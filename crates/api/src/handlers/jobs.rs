//! Handlers for conversion jobs.
//!
//! Uploads arrive as multipart forms: `pdf_file` for a single document,
//! repeated `pdf_files` for a batch.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use docflow_core::error::CoreError;
use docflow_core::job::Document;
use docflow_core::types::JobId;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const SINGLE_FIELD: &str = "pdf_file";
const BATCH_FIELD: &str = "pdf_files";

/// Body of a `202 Accepted` submission.
#[derive(Debug, Serialize)]
pub struct SubmittedJob {
    pub job_id: JobId,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collect every file uploaded under `field_name`, in form order.
async fn read_documents(multipart: &mut Multipart, field_name: &str) -> AppResult<Vec<Document>> {
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest(format!("Field '{field_name}' must be a file upload")))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read '{filename}': {e}")))?;
        documents.push(Document::new(filename, bytes.to_vec()));
    }

    Ok(documents)
}

async fn read_single(multipart: &mut Multipart) -> AppResult<Document> {
    let mut documents = read_documents(multipart, SINGLE_FIELD).await?;
    match documents.len() {
        1 => Ok(documents.remove(0)),
        0 => Err(AppError::BadRequest(format!("Missing file field '{SINGLE_FIELD}'"))),
        n => Err(AppError::BadRequest(format!(
            "Expected one '{SINGLE_FIELD}', got {n}; use /jobs/batch for several documents"
        ))),
    }
}

/// Path ids that do not parse are reported like any other unknown job.
fn parse_job_id(raw: &str) -> AppResult<JobId> {
    JobId::parse_str(raw).map_err(|_| {
        AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: raw.to_string(),
        })
    })
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /jobs/convert
///
/// Queue one document. Returns 202 with the job id.
pub async fn submit_single(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let document = read_single(&mut multipart).await?;
    let job_id = state.dispatcher.submit_single(document).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmittedJob { job_id },
        }),
    ))
}

/// POST /jobs/batch
///
/// Queue several documents as one job. Returns 202 with the job id.
pub async fn submit_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let documents = read_documents(&mut multipart, BATCH_FIELD).await?;
    if documents.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing file field '{BATCH_FIELD}'"
        )));
    }
    let job_id = state.dispatcher.submit_batch(documents).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmittedJob { job_id },
        }),
    ))
}

/// POST /convert
///
/// Queue one document and wait for its result. 504 if the job is still
/// running after the configured wait; it keeps running and stays pollable.
pub async fn convert_and_wait(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let document = read_single(&mut multipart).await?;
    let job_id = state.dispatcher.submit_single(document).await?;

    let wait = state.config.convert_wait;
    match state.dispatcher.wait_for(job_id, wait).await? {
        Some(view) => Ok(Json(DataResponse { data: view })),
        None => {
            tracing::warn!(job_id = %job_id, wait_secs = wait.as_secs(), "Conversion did not finish in time");
            Err(AppError::Timeout(format!(
                "Job {job_id} did not finish within {} seconds; poll /jobs/{job_id}",
                wait.as_secs()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&raw_id)?;
    let view = state.dispatcher.poll(job_id).await?;
    Ok(Json(DataResponse { data: view }))
}
