//! HTTP handler for the multipart upload endpoint. Collects the form fields,
//! enforces the request-level limits, and delegates the rest to
//! `UploadService`.

use crate::{
    AppState,
    errors::AppError,
    models::record::MetadataRecord,
    services::{filename::ALLOWED_EXTENSIONS, upload_service::MAX_UPLOAD_BYTES},
};
use axum::{
    Json,
    extract::{
        State,
        multipart::{Multipart, MultipartError},
    },
    http::{HeaderMap, StatusCode},
};
use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tracing::{info, warn};

/// Success body for `POST /upload`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub metadata: MetadataRecord,
}

/// The binary part of the form, with whatever the client declared about it.
struct FilePart {
    bytes: Bytes,
    file_name: Option<String>,
    content_type: Option<String>,
}

/// `POST /upload` — multipart form with `file`, `filename`, and `metadata`.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    if let Some(expected) = &state.api_key {
        let presented = headers.get("x-api-key").and_then(|value| value.to_str().ok());
        if presented != Some(expected.as_str()) {
            warn!("rejecting upload: x-api-key mismatch");
            return Err(AppError::new(StatusCode::UNAUTHORIZED, "Unauthorized"));
        }
    }

    let mut file: Option<FilePart> = None;
    let mut filename: Option<String> = None;
    let mut metadata: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);

                let mut buf = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if buf.len() + chunk.len() > MAX_UPLOAD_BYTES {
                        return Err(AppError::new(
                            StatusCode::PAYLOAD_TOO_LARGE,
                            "File size exceeds 10MB limit",
                        ));
                    }
                    buf.extend_from_slice(&chunk);
                }

                file = Some(FilePart {
                    bytes: buf.freeze(),
                    file_name,
                    content_type,
                });
            }
            Some("filename") => filename = Some(field.text().await.map_err(multipart_error)?),
            Some("metadata") => metadata = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    // Every absent field makes it into one response.
    let mut missing = Vec::new();
    if file.as_ref().is_none_or(|part| part.bytes.is_empty()) {
        missing.push("file");
    }
    if filename.as_deref().is_none_or(str::is_empty) {
        missing.push("filename");
    }
    if metadata.as_deref().is_none_or(str::is_empty) {
        missing.push("metadata");
    }
    let (Some(file), Some(filename), Some(metadata), true) =
        (file, filename, metadata, missing.is_empty())
    else {
        warn!("rejecting upload: missing fields {}", missing.join(", "));
        return Err(AppError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    };

    if !is_allowed_image(file.file_name.as_deref(), file.content_type.as_deref()) {
        return Err(AppError::bad_request(
            "Only image files (JPEG, PNG, WebP) are allowed",
        ));
    }

    let record = state
        .uploads
        .handle_upload(&filename, &metadata, file.bytes)
        .await?;

    info!("upload complete for {}", record.filename);

    Ok(Json(UploadResponse {
        image_url: record.image_url.clone(),
        metadata: record,
    }))
}

/// Declared-only check: the client's file extension and content type must
/// both name an accepted raster format. No content sniffing.
fn is_allowed_image(file_name: Option<&str>, content_type: Option<&str>) -> bool {
    let extension_ok = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));

    let content_type_ok = content_type.is_some_and(|declared| {
        let declared = declared.to_ascii_lowercase();
        ALLOWED_EXTENSIONS
            .iter()
            .any(|accepted| declared.contains(accepted))
    });

    extension_ok && content_type_ok
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_needs_both_extension_and_content_type() {
        assert!(is_allowed_image(Some("photo.PNG"), Some("image/png")));
        assert!(is_allowed_image(Some("photo.jpg"), Some("image/jpeg")));
        assert!(!is_allowed_image(Some("photo.gif"), Some("image/gif")));
        assert!(!is_allowed_image(Some("photo.png"), Some("application/pdf")));
        assert!(!is_allowed_image(Some("photo.png"), None));
        assert!(!is_allowed_image(None, Some("image/png")));
    }
}
