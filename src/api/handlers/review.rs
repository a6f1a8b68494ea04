use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::db_error;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::projection::{Caller, DocumentView, ViewKind};
use crate::state_machine::{ApprovalStatus, LifecycleStatus, Transition};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub approval_status: ApprovalStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleActiveRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct LifecycleRequest {
    pub status: LifecycleStatus,
}

/// Approve or reject a pending document.
pub async fn set_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    caller: Caller,
    AppJson(req): AppJson<ApprovalRequest>,
) -> Result<Json<JSend<DocumentView>>, ApiError> {
    let reviewer = caller.require_admin()?;

    let transition = match req.approval_status {
        ApprovalStatus::Approved => Transition::Approve,
        ApprovalStatus::Rejected => Transition::Reject,
        ApprovalStatus::Pending => {
            return Err(ApiError::bad_request(
                "approvalStatus must be \"approved\" or \"rejected\"",
            ))
        }
    };

    review(&state, &id, transition, reviewer).await
}

/// Show or hide an approved document.
pub async fn toggle_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    caller: Caller,
    AppJson(req): AppJson<ToggleActiveRequest>,
) -> Result<Json<JSend<DocumentView>>, ApiError> {
    let reviewer = caller.require_admin()?;
    review(&state, &id, Transition::SetActive(req.is_active), reviewer).await
}

pub async fn set_lifecycle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    caller: Caller,
    AppJson(req): AppJson<LifecycleRequest>,
) -> Result<Json<JSend<DocumentView>>, ApiError> {
    caller.require_admin()?;

    let doc = state
        .db
        .set_lifecycle(&id, req.status)
        .map_err(|e| db_error("Failed to update document status", e))?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    tracing::info!(document_id = %id, status = ?req.status, "Changed document lifecycle");
    Ok(JSend::success(DocumentView::render(ViewKind::Reviewer, &doc)))
}

async fn review(
    state: &AppState,
    id: &str,
    transition: Transition,
    reviewer: &str,
) -> Result<Json<JSend<DocumentView>>, ApiError> {
    let doc = state
        .db
        .review_document(id, transition, reviewer)
        .map_err(|e| db_error("Failed to review document", e))?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    tracing::info!(
        document_id = %id,
        transition = %transition,
        reviewer = %reviewer,
        approval_status = %doc.approval_status,
        is_active = doc.is_active,
        "Reviewed document"
    );
    Ok(JSend::success(DocumentView::render(ViewKind::Reviewer, &doc)))
}
