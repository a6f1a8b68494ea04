use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anyhow::Context;
use project_archive::{
    api,
    config::{Config, StorageBackend},
    object_store as obj,
    storage::Database,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "project-archive starting");

    // Invalid configuration aborts startup
    let config = Config::load()?;

    let db = Database::open(&config.server.data_dir)?;
    info!("Database opened at: {}", config.server.data_dir);

    // Initialize object store backend
    let (object_store, local_objects): (Arc<dyn obj::ObjectStore>, Option<Arc<obj::LocalStore>>) =
        match config.storage.backend {
            StorageBackend::Local => {
                let secret = config
                    .storage
                    .url_signing_secret
                    .as_deref()
                    .context("URL_SIGNING_SECRET is required for local storage")?;
                let signer = obj::UrlSigner::new(&config.server.public_base_url, secret.as_bytes());
                let store = Arc::new(obj::LocalStore::new(
                    &config.storage.local_storage_path,
                    signer,
                )?);
                info!(
                    "Using local storage backend at: {}",
                    config.storage.local_storage_path
                );
                let object_store: Arc<dyn obj::ObjectStore> = store.clone();
                (object_store, Some(store))
            }
            StorageBackend::Gcs => {
                let bucket = config
                    .storage
                    .gcs_bucket
                    .as_deref()
                    .context("GCS_BUCKET is required for GCS storage")?;
                let credentials = config
                    .storage
                    .gcs_credentials_file
                    .as_deref()
                    .context("GCS_CREDENTIALS_FILE is required for GCS storage")?;
                let store = obj::GcsStore::new(bucket, credentials).await?;
                info!("Using GCS storage backend, bucket: {}", bucket);
                let object_store: Arc<dyn obj::ObjectStore> = Arc::new(store);
                (object_store, None)
            }
        };

    let objects = obj::ObjectGateway::new(object_store, config.storage.download_url_ttl);

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        objects,
        local_objects,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
