mod gateway;
mod gcs;
mod local;
mod signing;

pub use gateway::{derive_key, sanitize_filename, ObjectGateway, KEY_PREFIX};
pub use gcs::GcsStore;
pub use local::LocalStore;
pub use signing::{SignatureError, UrlSigner};

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over object storage backends.
/// Keys are slash-separated paths such as `projects/poster_files/1700000000000-cover.jpg`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
    /// All keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;
    /// A URL granting read access to `key` for `ttl`. Does not check existence.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, ObjectStoreError>;
}
