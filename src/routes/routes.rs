//! Defines routes for the image upload and metadata endpoints.
//!
//! ## Structure
//! - `POST /upload`              — multipart upload: file + filename + metadata
//! - `GET  /templates`           — list all stored records as summaries, newest first
//! - `GET  /metadata/{filename}` — fetch one full record
//! - `GET  /healthz` / `/readyz` — liveness and storage readiness
//!
//! The body limit sits a little above the per-file cap so oversized files get
//! the explicit 413 from the upload handler rather than the framework's
//! default 2 MiB multipart ceiling.

use crate::{
    AppState,
    handlers::{
        health_handlers::{healthz, readyz},
        template_handlers::{get_metadata, list_templates},
        upload_handlers::upload,
    },
    services::upload_service::MAX_UPLOAD_BYTES,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Room for the non-file form fields and multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build and return the router for all endpoints.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // upload + read-side endpoints
        .route("/upload", post(upload))
        .route("/templates", get(list_templates))
        .route("/metadata/{filename}", get(get_metadata))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD))
}
