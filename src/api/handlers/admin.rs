use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{db_error, store_error};
use crate::api::response::{ApiError, AppQuery, JSend};
use crate::config::MIN_ORPHAN_GRACE_SECS;
use crate::object_store::ObjectGateway;
use crate::projection::Caller;
use crate::AppState;

/// Ten years; longer grace periods are clamped.
const MAX_GRACE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub documents_deleted: u64,
}

#[derive(Debug, Deserialize)]
pub struct SweepParams {
    /// Overrides the configured grace period, in seconds. Never below five minutes.
    #[serde(default)]
    pub grace_seconds: Option<u64>,
}

#[derive(Debug, Default, Serialize)]
pub struct SweepResponse {
    pub scanned: u64,
    pub deleted: u64,
    /// Unreferenced but still inside the grace period.
    pub retained: u64,
    pub failed: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state
        .db
        .purge_all()
        .map_err(|e| db_error("Failed to purge documents", e))?;

    tracing::warn!(documents = stats.documents, "Purged all data");

    Ok(JSend::success(PurgeResponse {
        documents_deleted: stats.documents,
    }))
}

/// Delete stored objects that no document references and that are older than
/// the grace period.
pub async fn sweep_orphans(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    AppQuery(params): AppQuery<SweepParams>,
) -> Result<Json<JSend<SweepResponse>>, ApiError> {
    caller.require_admin()?;

    let grace = params
        .grace_seconds
        .map(|s| s.clamp(MIN_ORPHAN_GRACE_SECS, MAX_GRACE_SECS))
        .map(|s| chrono::Duration::seconds(s as i64))
        .or_else(|| chrono::Duration::from_std(state.config.storage.orphan_grace_period).ok())
        .unwrap_or_else(|| chrono::Duration::days(1));
    let cutoff = Utc::now() - grace;

    let keys = state
        .objects
        .list_uploads()
        .await
        .map_err(|e| store_error("Failed to list stored objects", e))?;

    let mut report = SweepResponse::default();
    for key in keys {
        report.scanned += 1;

        let referenced = state
            .db
            .key_is_referenced(&key)
            .map_err(|e| db_error("Failed to check object reference", e))?;
        if referenced {
            continue;
        }

        // Keys without a readable timestamp are treated as old.
        let young = ObjectGateway::issued_at(&key).is_some_and(|at| at > cutoff);
        if young {
            report.retained += 1;
            continue;
        }

        match state.objects.store().delete(&key).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Swept orphaned object");
                report.deleted += 1;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to sweep orphaned object");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        deleted = report.deleted,
        retained = report.retained,
        failed = report.failed,
        "Orphan sweep finished"
    );

    Ok(JSend::success(report))
}
