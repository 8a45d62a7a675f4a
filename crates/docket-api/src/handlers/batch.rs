//! Batch metadata update handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use docket_core::models::{unique_document_ids, DocumentId, MetadataPatch, TaskState, TaskStatus};
use docket_core::AppError;
use docket_worker::SubmitBatch;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::BatchState;
use crate::utils::ip_extraction::ClientIp;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchMetadataRequest {
    pub document_ids: Vec<DocumentId>,
    pub metadata: MetadataPatch,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchSubmittedResponse {
    pub task_id: String,
    pub status: TaskState,
    /// Distinct documents that will be processed.
    pub total: usize,
}

/// Queue a metadata patch for a set of documents. Processing happens in the
/// background; poll the returned task id for the outcome.
#[tracing::instrument(skip_all, fields(user_id = user.user_id))]
pub async fn submit_batch_metadata(
    user: CurrentUser,
    ClientIp(origin_address): ClientIp,
    State(state): State<BatchState>,
    ValidatedJson(request): ValidatedJson<BatchMetadataRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let total = unique_document_ids(&request.document_ids).len();

    let task_id = state.engine.submit(SubmitBatch {
        document_ids: request.document_ids,
        metadata_patch: request.metadata,
        submitted_by: user.user_id,
        origin_address,
    })?;

    tracing::debug!(task_id = %task_id, total, "Batch metadata update accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchSubmittedResponse {
            task_id,
            status: TaskState::Queued,
            total,
        }),
    ))
}

/// Current status of a batch task, with its result once finished.
#[tracing::instrument(skip(state))]
pub async fn get_batch_task(
    _user: CurrentUser,
    State(state): State<BatchState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatus>, HttpAppError> {
    match state.engine.status(&task_id) {
        Some(status) => Ok(Json(status)),
        None => {
            tracing::debug!(task_id = %task_id, "Batch task not found");
            Err(AppError::NotFound("Task not found".to_string()).into())
        }
    }
}
