use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::form::{discard_uploads, store_uploads, SubmissionForm};
use super::db_error;
use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::manifest::FileManifest;
use crate::projection::{Caller, DocumentView, ViewKind};
use crate::state_machine::ApprovalStatus;
use crate::storage::models::{DocumentFilter, DocumentRecord, DocumentType};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CreatedDocument {
    pub id: String,
    pub file_paths: FileManifest,
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub status: Option<ApprovalStatus>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default, rename = "type")]
    pub document_type: Option<String>,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_document(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JSend<CreatedDocument>>), ApiError> {
    let owner = caller.require_id()?.to_string();

    let form = SubmissionForm::read(&state, multipart).await?;
    let metadata = form.metadata()?;

    // Phase 1: upload every file to object storage
    let (manifest, written) = store_uploads(&state, form.files).await?;

    // Phase 2: commit the row and its key index in one transaction
    let id = uuid::Uuid::new_v4().to_string();
    let doc = DocumentRecord::new(id.clone(), metadata, manifest, owner);

    if let Err(e) = state.db.create_document(&doc) {
        discard_uploads(&state, &written).await;
        return Err(db_error("Failed to create document", e));
    }

    tracing::info!(
        document_id = %id,
        submitted_by = %doc.submitted_by,
        files = written.len(),
        "Created document"
    );

    Ok(JSend::created(CreatedDocument {
        id,
        file_paths: doc.file_paths,
    }))
}

pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Json<JSend<DocumentView>>, ApiError> {
    let caller_id = caller.require_id()?;

    let existing = state
        .db
        .get_document(&id)
        .map_err(|e| db_error("Failed to load document", e))?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    if !existing.is_owned_by(caller_id) {
        return Err(ApiError::forbidden("Only the submitter may edit this document"));
    }
    // Checked before uploading so a refused edit writes nothing.
    if existing.approval_status == ApprovalStatus::Approved {
        return Err(ApiError::conflict("An approved document cannot be edited"));
    }

    let form = SubmissionForm::read(&state, multipart).await?;
    let patch = form.metadata_patch()?;
    let (delta, written) = store_uploads(&state, form.files).await?;

    let outcome = match state.db.update_document(&id, patch, delta) {
        Ok(Some(outcome)) => outcome,
        Ok(None) => {
            discard_uploads(&state, &written).await;
            return Err(ApiError::not_found("Document not found"));
        }
        Err(e) => {
            discard_uploads(&state, &written).await;
            return Err(db_error("Failed to update document", e));
        }
    };

    tracing::info!(
        document_id = %id,
        added = written.len(),
        superseded = outcome.superseded.len(),
        "Updated document"
    );

    Ok(JSend::success(DocumentView::render(
        ViewKind::Owner,
        &outcome.document,
    )))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    caller: Caller,
) -> Result<Json<JSend<DocumentView>>, ApiError> {
    let doc = state
        .db
        .get_document(&id)
        .map_err(|e| db_error("Failed to load document", e))?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    // Hidden documents look missing to callers who may not see them.
    let view = DocumentView::for_caller(&caller, &doc)
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    Ok(JSend::success(view))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppQuery(params): AppQuery<ListDocumentsParams>,
) -> Result<Json<JSendPaginated<DocumentView>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let document_type = params
        .document_type
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.parse::<DocumentType>().map_err(ApiError::bad_request))
        .transpose()?;

    let reviewer = caller.role.is_reviewer();
    let filter = DocumentFilter {
        approval_status: if reviewer { params.status } else { None },
        search: params.search,
        department: params.department,
        year: params.year,
        document_type,
        public_only: !reviewer,
    };

    let docs = state
        .db
        .list_documents(&filter)
        .map_err(|e| db_error("Failed to list documents", e))?;

    let total = docs.len() as u64;
    let items: Vec<DocumentView> = docs
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .filter_map(|doc| DocumentView::for_caller(&caller, doc))
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

pub async fn list_my_documents(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<JSendPaginated<DocumentView>>, ApiError> {
    let owner = caller.require_id()?;
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let mut docs = state
        .db
        .get_documents_by_owner(owner)
        .map_err(|e| db_error("Failed to list documents", e))?;
    docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = docs.len() as u64;
    let items: Vec<DocumentView> = docs
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(|doc| DocumentView::render(ViewKind::Owner, doc))
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    caller: Caller,
) -> Result<Json<JSend<()>>, ApiError> {
    let admin = caller.require_admin()?;

    let doc = state
        .db
        .delete_document(&id)
        .map_err(|e| db_error("Failed to delete document", e))?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    // Stored files stay until the orphan sweep reclaims them.
    tracing::info!(
        document_id = %id,
        deleted_by = %admin,
        files = doc.file_paths.keys().count(),
        "Deleted document"
    );
    Ok(JSend::success(()))
}
