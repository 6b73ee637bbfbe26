use anyhow::Result;
use axum::Router;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{
    image_host::ImageKitClient, metadata_store::MetadataStore, upload_service::UploadService,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: MetadataStore,
    pub uploads: UploadService,
    pub api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config; missing ImageKit credentials abort here ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        "Starting imagegen-backend on {} (storage: {}, api key check: {})",
        cfg.addr(),
        cfg.storage_dir,
        if cfg.api_key.is_some() { "on" } else { "off" }
    );

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize services ---
    let store = MetadataStore::new(&cfg.storage_dir);
    let image_host = Arc::new(ImageKitClient::new(&cfg.imagekit)?);
    tracing::info!(
        "Image host configured with endpoint {} (public key {})",
        cfg.imagekit.url_endpoint,
        cfg.imagekit.public_key
    );

    let state = AppState {
        store: store.clone(),
        uploads: UploadService::new(store, image_host),
        api_key: cfg.api_key.clone(),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
