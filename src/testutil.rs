//! Shared test helpers for handler tests.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ServerConfig, StorageConfig};
use crate::object_store::{LocalStore, ObjectGateway, UrlSigner};
use crate::storage::Database;
use crate::AppState;

pub const TEST_BASE_URL: &str = "http://archive.test";
pub const TEST_SIGNING_SECRET: &str = "test-signing-secret";

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            public_base_url: TEST_BASE_URL.to_string(),
            allowed_origins: Vec::new(),
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
            url_signing_secret: Some(TEST_SIGNING_SECRET.to_string()),
            download_url_ttl: Duration::from_secs(300),
            ..StorageConfig::default()
        },
        test_mode: true,
        max_upload_size: 1024 * 1024, // 1MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let signer = UrlSigner::new(TEST_BASE_URL, TEST_SIGNING_SECRET.as_bytes());
    let store =
        Arc::new(LocalStore::new(&files_dir, signer).expect("Failed to create test object store"));
    let objects = ObjectGateway::new(store.clone(), config.storage.download_url_ttl);

    Arc::new(AppState {
        config,
        db,
        objects,
        local_objects: Some(store),
    })
}

pub const BOUNDARY: &str = "archive-test-boundary";

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }
}
