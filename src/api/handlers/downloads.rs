use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::{db_error, store_error};
use crate::api::response::{ApiError, AppQuery};
use crate::projection::{can_download, Caller};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignedLinkParams {
    #[serde(default)]
    pub expires: Option<i64>,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Redirect to a time-limited link for a stored file.
/// Route: GET /download?key=...
pub async fn download(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppQuery(params): AppQuery<DownloadParams>,
) -> Result<Response, ApiError> {
    let key = params
        .key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("key query parameter is required"))?;

    let doc = state
        .db
        .get_document_by_key(&key)
        .map_err(|e| db_error("Failed to resolve object key", e))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    if !can_download(&caller, &doc) {
        return Err(ApiError::forbidden("Not allowed to download this file"));
    }

    let url = state
        .objects
        .url_for(&key)
        .await
        .map_err(|e| store_error("Failed to issue download link", e))?;

    tracing::debug!(key = %key, document_id = %doc.id, "Issued download link");

    // 302 rather than Redirect::to, which answers 303.
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

/// Serve a signed link issued by the local backend.
/// Route: GET /objects/*key?expires=...&signature=...
pub async fn serve_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    AppQuery(params): AppQuery<SignedLinkParams>,
) -> Result<Response, ApiError> {
    let store = state
        .local_objects
        .as_ref()
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let (Some(expires), Some(signature)) = (params.expires, params.signature) else {
        return Err(ApiError::forbidden("Download link is not signed"));
    };

    let now = chrono::Utc::now().timestamp();
    store
        .signer()
        .verify(&key, expires, &signature, now)
        .map_err(|e| ApiError::forbidden(e.to_string()))?;

    let (file, len) = store
        .open(&key)
        .await
        .map_err(|e| store_error("Failed to open object", e))?;

    let mime = mime_guess::from_path(&key).first_or_octet_stream();
    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    if let Ok(value) = format!("attachment; filename=\"{}\"", download_name(&key)).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // The link itself expires, so intermediaries must not keep it.
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, no-store"));

    Ok(response)
}

/// Original (sanitized) filename: last key segment without its timestamp.
fn download_name(key: &str) -> &str {
    let segment = key.rsplit('/').next().unwrap_or(key);
    match segment.split_once('-') {
        Some((millis, rest)) if millis.bytes().all(|b| b.is_ascii_digit()) => rest,
        _ => segment,
    }
}
