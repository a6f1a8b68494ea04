mod admin;
mod documents;
mod downloads;
mod form;
mod review;

use crate::api::response::ApiError;
use crate::object_store::ObjectStoreError;
use crate::storage::DatabaseError;

pub use admin::{admin_purge, health, sweep_orphans};
pub use documents::{
    create_document, delete_document, get_document, list_documents, list_my_documents,
    update_document,
};
pub use downloads::{download, serve_object};
pub use review::{set_approval, set_lifecycle, toggle_active};

/// Map a DatabaseError to an ApiError, logging anything unexpected under `context`.
fn db_error(context: &str, e: DatabaseError) -> ApiError {
    match e {
        DatabaseError::Transition(t) => ApiError::conflict(t.to_string()),
        // The message names another document, so it stays in the log.
        DatabaseError::KeyConflict { .. } => {
            tracing::error!(error = %e, "{context}");
            ApiError::internal(context)
        }
        _ => {
            tracing::error!(error = %e, "{context}");
            ApiError::internal(format!("{context}: {e}"))
        }
    }
}

/// Map an ObjectStoreError to an ApiError, logging anything unexpected under `context`.
fn store_error(context: &str, e: ObjectStoreError) -> ApiError {
    match e {
        ObjectStoreError::NotFound(_) | ObjectStoreError::InvalidKey(_) => {
            ApiError::not_found("File not found")
        }
        _ => {
            tracing::error!(error = %e, "{context}");
            ApiError::internal(format!("{context}: {e}"))
        }
    }
}
