//! Upload orchestration: validate the client's metadata and filename, hand
//! the bytes to the image host, merge the host result with the client fields,
//! and persist the finished record.
//!
//! The record is written only after the host call succeeds, so a failed
//! upload never leaves a metadata file behind. The reverse failure (host
//! succeeded, write failed) orphans the remote asset; that inconsistency is
//! accepted and logged.

use crate::models::record::MetadataRecord;
use crate::services::{
    filename::{self, FilenameError, ValidatedFilename},
    image_host::{HostedImage, ImageHost, ImageHostError, UploadedImage},
    metadata_store::{MetadataStore, StoreError},
};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Hard cap on accepted file payloads.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Metadata keys every upload must carry.
pub const REQUIRED_METADATA_FIELDS: [&str; 6] = [
    "prompt",
    "style",
    "aspect_ratio",
    "model",
    "userId",
    "timestamp",
];

/// Keys the server constructs itself; client values for these are discarded.
const CONSTRUCTED_FIELDS: [&str; 5] = [
    "filename",
    "imageUrl",
    "thumbnailUrl",
    "fileId",
    "uploadedAt",
];

const UPLOAD_FOLDER: &str = "/imagegen-pro";
const BASE_TAG: &str = "imagegen-pro";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid metadata JSON")]
    InvalidMetadataJson,
    #[error("Missing required metadata fields: {}", .0.join(", "))]
    MissingMetadataFields(Vec<String>),
    #[error(transparent)]
    Filename(#[from] FilenameError),
    #[error("Upload failed: {0}")]
    Host(#[from] ImageHostError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives one upload end to end. Cheap to clone; shared via router state.
#[derive(Clone)]
pub struct UploadService {
    store: MetadataStore,
    host: Arc<dyn ImageHost>,
}

impl UploadService {
    pub fn new(store: MetadataStore, host: Arc<dyn ImageHost>) -> Self {
        Self { store, host }
    }

    /// Validate, delegate to the host, merge, persist. Returns the record
    /// exactly as it was written to disk.
    pub async fn handle_upload(
        &self,
        raw_filename: &str,
        raw_metadata: &str,
        bytes: Bytes,
    ) -> Result<MetadataRecord, UploadError> {
        let client_fields: Map<String, Value> =
            serde_json::from_str(raw_metadata).map_err(|_| UploadError::InvalidMetadataJson)?;

        let missing: Vec<String> = REQUIRED_METADATA_FIELDS
            .iter()
            .filter(|field| !has_text(&client_fields, field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(UploadError::MissingMetadataFields(missing));
        }

        let validated = filename::validate(raw_filename)?;

        info!(
            "uploading {} ({} bytes) to image host",
            validated,
            bytes.len()
        );

        let tags = vec![
            BASE_TAG.to_string(),
            text(&client_fields, "model"),
            text(&client_fields, "style"),
        ];
        let hosted = self
            .host
            .upload(UploadedImage {
                bytes,
                file_name: validated.as_str().to_string(),
                folder: UPLOAD_FOLDER.to_string(),
                tags,
            })
            .await?;

        info!("image host accepted {} -> {}", validated, hosted.url);

        let record = merge_record(&validated, &hosted, client_fields);
        if let Err(err) = self.store.put(&validated, &record).await {
            // The asset already exists remotely; only the local record is lost.
            warn!("metadata write failed after successful host upload: {err}");
            return Err(err.into());
        }

        Ok(record)
    }
}

/// Combine the host result with the client metadata. Constructed fields win
/// over anything the client supplied under the same keys; all other client
/// keys pass through untouched.
fn merge_record(
    filename: &ValidatedFilename,
    hosted: &HostedImage,
    mut client: Map<String, Value>,
) -> MetadataRecord {
    let prompt = take_text(&mut client, "prompt");
    let style = take_text(&mut client, "style");
    let aspect_ratio = take_text(&mut client, "aspect_ratio");
    let model = take_text(&mut client, "model");
    let user_id = take_text(&mut client, "userId");
    let timestamp = take_text(&mut client, "timestamp");
    for key in CONSTRUCTED_FIELDS {
        client.remove(key);
    }

    MetadataRecord {
        filename: filename.as_str().to_string(),
        image_url: hosted.url.clone(),
        thumbnail_url: hosted
            .thumbnail_url
            .clone()
            .unwrap_or_else(|| hosted.url.clone()),
        file_id: hosted.file_id.clone(),
        prompt,
        style,
        aspect_ratio,
        model,
        user_id,
        timestamp,
        uploaded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        extra: client,
    }
}

/// A required field counts as present only when it is a non-empty string.
fn has_text(fields: &Map<String, Value>, key: &str) -> bool {
    fields
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|value| !value.is_empty())
}

fn text(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn take_text(fields: &mut Map<String, Value>, key: &str) -> String {
    match fields.remove(key) {
        Some(Value::String(value)) => value,
        _ => String::new(),
    }
}
