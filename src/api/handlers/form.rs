//! Multipart submission form shared by create and edit.

use std::collections::HashMap;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;

use crate::api::response::ApiError;
use crate::manifest::{FileCategory, FileManifest, ManifestBuilder};
use crate::storage::models::{DocumentMetadata, DocumentType, MetadataPatch, Patch};
use crate::AppState;

/// One file part waiting to be written to the object store.
#[derive(Debug)]
pub struct PendingUpload {
    pub category: FileCategory,
    pub file_name: String,
    pub data: Bytes,
}

#[derive(Debug, Default)]
pub struct SubmissionForm {
    fields: HashMap<&'static str, String>,
    pub files: Vec<PendingUpload>,
}

/// Canonical metadata field for a form field name, accepting the legacy
/// camelCase spellings.
fn metadata_field(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "title" => "title",
        "title_eng" | "titleEng" => "title_eng",
        "document_type" | "documentType" => "document_type",
        "author" => "author",
        "co_author" | "coAuthor" => "co_author",
        "abstract" => "abstract",
        "advisor_name" | "advisorName" => "advisor_name",
        "co_advisor_name" | "coAdvisorName" => "co_advisor_name",
        "department" => "department",
        "keywords" => "keywords",
        "support_agency" | "supportAgency" => "support_agency",
        "language" => "language",
        "publish_year" | "publishYear" => "publish_year",
        "scan_date" | "scanDate" => "scan_date",
        "display_date" | "displayDate" => "display_date",
        _ => return None,
    };
    Some(canonical)
}

impl SubmissionForm {
    /// Drain the multipart stream. File parts must be named after a category;
    /// unknown fields are ignored.
    pub async fn read(state: &AppState, mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = SubmissionForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(state, e))?
        {
            let field_name = field.name().unwrap_or("").to_string();

            if let Some(file_name) = field.file_name().map(|s| s.to_string()) {
                let Some(category) = FileCategory::from_field_name(&field_name) else {
                    tracing::debug!(field = %field_name, "Ignoring file in unknown category");
                    continue;
                };

                let data = field.bytes().await.map_err(|e| multipart_error(state, e))?;

                // Browsers send an empty part for an untouched file input.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(too_large(state));
                }

                form.files.push(PendingUpload {
                    category,
                    file_name,
                    data,
                });
                continue;
            }

            if let Some(canonical) = metadata_field(&field_name) {
                let text = field.text().await.map_err(|e| multipart_error(state, e))?;
                form.add_field(canonical, text)?;
            }
        }

        Ok(form)
    }

    /// Repeated `document_type` parts accumulate, as a multi-select sends
    /// one part per tag. Any other field may appear once.
    fn add_field(&mut self, name: &'static str, value: String) -> Result<(), ApiError> {
        match self.fields.get_mut(name) {
            None => {
                self.fields.insert(name, value);
            }
            Some(joined) if name == "document_type" => {
                joined.push(',');
                joined.push_str(&value);
            }
            Some(_) => {
                return Err(ApiError::bad_request(format!(
                    "{name} field must not be repeated"
                )))
            }
        }
        Ok(())
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn patch(&self, name: &str) -> Patch<String> {
        match self.fields.get(name) {
            None => Patch::Absent,
            Some(v) if v.trim().is_empty() => Patch::Null,
            Some(v) => Patch::Value(v.trim().to_string()),
        }
    }

    fn document_types(
        &self,
    ) -> Result<Option<std::collections::BTreeSet<DocumentType>>, ApiError> {
        self.fields
            .get("document_type")
            .map(|joined| DocumentType::parse_set(joined).map_err(ApiError::bad_request))
            .transpose()
    }

    /// Metadata for a new submission. `title` is required.
    pub fn metadata(&self) -> Result<DocumentMetadata, ApiError> {
        let title = self
            .optional("title")
            .ok_or_else(|| ApiError::bad_request("title field is required"))?;

        Ok(DocumentMetadata {
            title,
            document_type: self.document_types()?.unwrap_or_default(),
            title_eng: self.optional("title_eng"),
            author: self.optional("author"),
            co_author: self.optional("co_author"),
            abstract_text: self.optional("abstract"),
            advisor_name: self.optional("advisor_name"),
            co_advisor_name: self.optional("co_advisor_name"),
            department: self.optional("department"),
            keywords: self.optional("keywords"),
            support_agency: self.optional("support_agency"),
            language: self.optional("language"),
            publish_year: self.optional("publish_year"),
            scan_date: self.optional("scan_date"),
            display_date: self.optional("display_date"),
        })
    }

    /// Partial metadata for an edit. Present fields replace, empty ones clear.
    pub fn metadata_patch(&self) -> Result<MetadataPatch, ApiError> {
        let title = match self.fields.get("title") {
            None => None,
            Some(t) if t.trim().is_empty() => {
                return Err(ApiError::bad_request("title must not be empty"))
            }
            Some(t) => Some(t.trim().to_string()),
        };

        Ok(MetadataPatch {
            title,
            document_type: self.document_types()?,
            title_eng: self.patch("title_eng"),
            author: self.patch("author"),
            co_author: self.patch("co_author"),
            abstract_text: self.patch("abstract"),
            advisor_name: self.patch("advisor_name"),
            co_advisor_name: self.patch("co_advisor_name"),
            department: self.patch("department"),
            keywords: self.patch("keywords"),
            support_agency: self.patch("support_agency"),
            language: self.patch("language"),
            publish_year: self.patch("publish_year"),
            scan_date: self.patch("scan_date"),
            display_date: self.patch("display_date"),
        })
    }
}

fn too_large(state: &AppState) -> ApiError {
    ApiError::payload_too_large(format!(
        "File exceeds maximum upload size of {} bytes",
        state.config.max_upload_size
    ))
}

/// The body limit surfaces as a multipart read error; keep its 413.
fn multipart_error(state: &AppState, e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(state)
    } else {
        ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
    }
}

/// Compensate a failed write by deleting the objects this request stored.
/// A key some committed document still references is left alone: an upload
/// that landed on an existing key must not take that document's file with it.
pub async fn discard_uploads(state: &AppState, written: &[String]) {
    let mut unreferenced = Vec::with_capacity(written.len());
    for key in written {
        match state.db.key_is_referenced(key) {
            Ok(false) => unreferenced.push(key.clone()),
            Ok(true) => {
                tracing::warn!(key = %key, "Upload collided with a referenced key; keeping it")
            }
            // Left for the orphan sweep
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to check object reference"),
        }
    }
    state.objects.discard(&unreferenced).await;
}

/// Write every pending upload to the object store, in order. If any write
/// fails, the ones already written are discarded before the error returns.
pub async fn store_uploads(
    state: &AppState,
    uploads: Vec<PendingUpload>,
) -> Result<(FileManifest, Vec<String>), ApiError> {
    let mut builder = ManifestBuilder::new();
    let mut written = Vec::with_capacity(uploads.len());

    for upload in uploads {
        match state
            .objects
            .put(upload.category, &upload.file_name, upload.data)
            .await
        {
            Ok(key) => {
                builder.add(upload.category, key.clone());
                written.push(key);
            }
            Err(e) => {
                tracing::error!(
                    category = %upload.category,
                    file_name = %upload.file_name,
                    error = %e,
                    "Failed to store upload"
                );
                discard_uploads(state, &written).await;
                return Err(ApiError::internal(format!("Failed to store file: {e}")));
            }
        }
    }

    Ok((builder.build(), written))
}
