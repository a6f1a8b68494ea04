use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Origin this service is reachable at; local download links are built on it.
    pub public_base_url: String,
    /// Browser origins allowed to call the API. `*` allows any.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// HMAC key for local download links (required when backend is local)
    pub url_signing_secret: Option<String>,
    /// GCS bucket name (required when backend is gcs)
    pub gcs_bucket: Option<String>,
    /// Path to GCS service account JSON (required when backend is gcs)
    pub gcs_credentials_file: Option<String>,
    /// Lifetime of issued download links
    pub download_url_ttl: Duration,
    /// How old an unreferenced object must be before the sweep removes it
    pub orphan_grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            url_signing_secret: None,
            gcs_bucket: None,
            gcs_credentials_file: None,
            download_url_ttl: Duration::from_secs(300),
            orphan_grace_period: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Longest lifetime GCS accepts for a V4 signed URL (7 days).
const MAX_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Shortest grace period the orphan sweep honours. Uploads of a request still
/// in flight are unreferenced until its transaction commits.
pub const MIN_ORPHAN_GRACE_SECS: u64 = 5 * 60;

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();
        let storage_defaults = StorageConfig::default();

        let bind_address = var("BIND_ADDRESS").unwrap_or(defaults.bind_address);
        let data_dir = var("DATA_DIR").unwrap_or(defaults.data_dir);
        let public_base_url = var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url);
        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let test_mode = var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = parse_number(&var, "MAX_UPLOAD_SIZE")?.unwrap_or(50 * 1024 * 1024); // 50MB

        let backend = match var("STORAGE_BACKEND")
            .unwrap_or_else(|| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "gcs" => StorageBackend::Gcs,
            "local" => StorageBackend::Local,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "STORAGE_BACKEND must be 'local' or 'gcs', got '{other}'"
                )))
            }
        };

        let download_url_ttl = parse_number(&var, "DOWNLOAD_URL_TTL")?
            .map(Duration::from_secs)
            .unwrap_or(storage_defaults.download_url_ttl);
        let orphan_grace_period = parse_number(&var, "ORPHAN_GRACE_PERIOD")?
            .map(Duration::from_secs)
            .unwrap_or(storage_defaults.orphan_grace_period);

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
                public_base_url,
                allowed_origins,
            },
            storage: StorageConfig {
                backend,
                local_storage_path: var("LOCAL_STORAGE_PATH")
                    .unwrap_or(storage_defaults.local_storage_path),
                url_signing_secret: var("URL_SIGNING_SECRET"),
                gcs_bucket: var("GCS_BUCKET"),
                gcs_credentials_file: var("GCS_CREDENTIALS_FILE"),
                download_url_ttl,
                orphan_grace_period,
            },
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        match self.storage.backend {
            StorageBackend::Local => {
                if self
                    .storage
                    .url_signing_secret
                    .as_deref()
                    .map_or(true, |s| s.trim().is_empty())
                {
                    return fail("URL_SIGNING_SECRET is required when STORAGE_BACKEND=local");
                }
            }
            StorageBackend::Gcs => {
                if self.storage.gcs_bucket.is_none() {
                    return fail("GCS_BUCKET is required when STORAGE_BACKEND=gcs");
                }
                if self.storage.gcs_credentials_file.is_none() {
                    return fail("GCS_CREDENTIALS_FILE is required when STORAGE_BACKEND=gcs");
                }
            }
        }

        let ttl = self.storage.download_url_ttl.as_secs();
        if ttl == 0 || ttl > MAX_URL_TTL_SECS {
            return fail("DOWNLOAD_URL_TTL must be between 1 and 604800 seconds");
        }

        if self.storage.orphan_grace_period.as_secs() < MIN_ORPHAN_GRACE_SECS {
            return fail("ORPHAN_GRACE_PERIOD must be at least 300 seconds");
        }

        if !self.server.public_base_url.starts_with("http://")
            && !self.server.public_base_url.starts_with("https://")
        {
            return fail("PUBLIC_BASE_URL must be an http(s) URL");
        }

        if self.max_upload_size == 0 {
            return fail("MAX_UPLOAD_SIZE must be greater than 0");
        }

        if self.test_mode {
            tracing::warn!("TEST_MODE is enabled; destructive admin routes are exposed");
        }

        Ok(())
    }
}

fn parse_number(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<u64>, ConfigError> {
    match var(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ConfigError::ValidationError(format!("{name} must be a non-negative integer"))
        }),
    }
}
