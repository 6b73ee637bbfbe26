//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks storage-directory I/O

use crate::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that performs a best-effort write/read/delete against the
/// metadata storage root. Returns JSON describing the check. HTTP 200 when it
/// passes, HTTP 503 when it fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let root = state.store.root();
    let tmp_path = root.join(format!(".readyz-{}", Uuid::new_v4()));

    let disk_check = match fs::create_dir_all(root).await {
        Ok(_) => match fs::write(&tmp_path, b"readyz").await {
            Ok(_) => match fs::read(&tmp_path).await {
                Ok(bytes) => {
                    if bytes == b"readyz" {
                        // try to remove the temp file; ignore removal error but report if it happens
                        match fs::remove_file(&tmp_path).await {
                            Ok(_) => (true, None::<String>),
                            Err(e) => (true, Some(format!("could not remove tmp file: {}", e))),
                        }
                    } else {
                        // content mismatch
                        let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
                        (false, Some("file content mismatch".to_string()))
                    }
                }
                Err(e) => {
                    let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
                    (false, Some(format!("could not read tmp file: {}", e)))
                }
            },
            Err(e) => (false, Some(format!("could not write tmp file: {}", e))),
        },
        Err(e) => (false, Some(format!("could not create storage root: {}", e))),
    };

    let (ok, error) = disk_check;
    let body = ReadyResponse {
        status: if ok { "ok".into() } else { "error".into() },
        storage: CheckStatus { ok, error },
    };

    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    storage: CheckStatus,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
