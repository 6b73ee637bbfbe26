//! Read-side handlers: the template listing and the per-record detail fetch.

use crate::{
    AppState,
    errors::AppError,
    models::{record::MetadataRecord, template::TemplateSummary},
    services::filename,
};
use axum::{
    Json,
    extract::{Path, State},
};
use std::cmp::Reverse;
use tracing::{debug, warn};

/// `GET /templates` — every readable record projected to a summary, newest
/// first. Records that fail to parse are logged and dropped; the listing
/// degrades instead of erroring.
pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<TemplateSummary>>, AppError> {
    let entries = state.store.list_all().await?;

    let mut summaries = Vec::with_capacity(entries.len());
    for (key, parsed) in entries {
        match parsed {
            Ok(record) => summaries.push(TemplateSummary::from_record(&key, &record)),
            Err(err) => warn!("skipping unreadable record `{key}`: {err}"),
        }
    }

    // Stable sort: ties keep their encounter order.
    summaries.sort_by_key(|summary| Reverse(summary.recency()));

    debug!("returning {} templates", summaries.len());
    Ok(Json(summaries))
}

/// `GET /metadata/{filename}` — the full stored record.
///
/// Only the character-substitution sanitizer guards this path; names that
/// could never pass upload validation are still looked up and 404 when no
/// file matches.
pub async fn get_metadata(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MetadataRecord>, AppError> {
    if filename::sanitize(&name) != name {
        return Err(AppError::bad_request("Invalid filename"));
    }

    let record = state.store.get(&name).await?;
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        filename,
        image_host::{HostedImage, ImageHost, ImageHostError, UploadedImage},
        metadata_store::MetadataStore,
        upload_service::UploadService,
    };
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use serde_json::Map;
    use std::sync::Arc;

    struct NullHost;

    #[async_trait]
    impl ImageHost for NullHost {
        async fn upload(&self, _image: UploadedImage) -> Result<HostedImage, ImageHostError> {
            unreachable!("read-side tests never upload")
        }
    }

    fn state_with(store: MetadataStore) -> AppState {
        AppState {
            uploads: UploadService::new(store.clone(), Arc::new(NullHost)),
            store,
            api_key: None,
        }
    }

    fn record(name: &str, timestamp: &str) -> MetadataRecord {
        MetadataRecord {
            filename: name.into(),
            image_url: format!("https://cdn.example/{name}"),
            thumbnail_url: String::new(),
            file_id: "abc123".into(),
            prompt: "a lighthouse at dusk".into(),
            style: "photorealistic".into(),
            aspect_ratio: "1:1".into(),
            model: "flux-pro".into(),
            user_id: "user-1".into(),
            timestamp: timestamp.into(),
            uploaded_at: "2026-08-01T00:00:00.000Z".into(),
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn listing_skips_corrupt_records_and_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        for (name, timestamp) in [
            ("IMG_older.png", "2026-08-01T08:00:00Z"),
            ("IMG_newer.png", "2026-08-04T08:00:00Z"),
        ] {
            let key = filename::validate(name).unwrap();
            store.put(&key, &record(name, timestamp)).await.unwrap();
        }
        std::fs::write(dir.path().join("IMG_broken.png.json"), "not json").unwrap();

        let Json(summaries) = list_templates(State(state_with(store))).await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "IMG_newer.png");
        assert_eq!(summaries[1].id, "IMG_older.png");
    }

    #[tokio::test]
    async fn listing_with_no_storage_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("missing"));

        let Json(summaries) = list_templates(State(state_with(store))).await.unwrap();
        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn missing_record_is_a_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(MetadataStore::new(dir.path()));

        let err = get_metadata(State(state), Path("does-not-exist".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn names_altered_by_sanitization_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(MetadataStore::new(dir.path()));

        let err = get_metadata(State(state), Path("IMG bad.png".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
