use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};

use super::{ObjectStore, ObjectStoreError};
use crate::manifest::FileCategory;

/// Every document upload lives under this prefix.
pub const KEY_PREFIX: &str = "projects/";

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `projects/<category>/<millis>-<sanitized name>`
pub fn derive_key(category: FileCategory, original_name: &str, millis: i64) -> String {
    format!(
        "{KEY_PREFIX}{category}/{millis}-{}",
        sanitize_filename(original_name)
    )
}

/// Names uploads, stores them, and hands out time-limited download links.
#[derive(Clone)]
pub struct ObjectGateway {
    store: Arc<dyn ObjectStore>,
    url_ttl: Duration,
}

impl ObjectGateway {
    pub fn new(store: Arc<dyn ObjectStore>, url_ttl: Duration) -> Self {
        Self { store, url_ttl }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Store one upload and return its durable key. Two uploads of the same
    /// name in the same millisecond overwrite each other.
    pub async fn put(
        &self,
        category: FileCategory,
        original_name: &str,
        data: Bytes,
    ) -> Result<String, ObjectStoreError> {
        let key = derive_key(category, original_name, Utc::now().timestamp_millis());
        self.store.put(&key, data).await?;
        tracing::debug!(key = %key, category = %category, "Stored upload");
        Ok(key)
    }

    /// Signed link for an existing key; `NotFound` if the store lacks it.
    pub async fn url_for(&self, key: &str) -> Result<String, ObjectStoreError> {
        if !self.store.exists(key).await? {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        self.store.signed_url(key, self.url_ttl).await
    }

    /// Best-effort removal used to compensate a failed write. Returns the
    /// keys that could not be removed.
    pub async fn discard(&self, keys: &[String]) -> Vec<String> {
        let mut failed = Vec::new();
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to discard object");
                failed.push(key.clone());
            }
        }
        failed
    }

    /// All keys written by this gateway, referenced or not.
    pub async fn list_uploads(&self) -> Result<Vec<String>, ObjectStoreError> {
        self.store.list(KEY_PREFIX).await
    }

    /// Upload time recovered from a key's timestamp prefix.
    pub fn issued_at(key: &str) -> Option<DateTime<Utc>> {
        let segment = key.rsplit('/').next()?;
        let (millis, _) = segment.split_once('-')?;
        let millis: i64 = millis.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}
