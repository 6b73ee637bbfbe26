//! The external image host, treated as an opaque collaborator: it stores the
//! binary and hands back a durable URL plus an asset id. The trait seam exists
//! so the upload path can be exercised against a stub.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use reqwest::{Client, multipart};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ImageKitConfig;

/// Bytes plus placement hints, as the host's upload API wants them.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub file_name: String,
    pub folder: String,
    pub tags: Vec<String>,
}

/// What the host returns for a stored asset.
#[derive(Debug, Clone, Deserialize)]
pub struct HostedImage {
    pub url: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "fileId")]
    pub file_id: String,
}

#[derive(Debug, Error)]
pub enum ImageHostError {
    #[error("image host rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("image host request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Transient and permanent failures surface uniformly; callers do not retry.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: UploadedImage) -> Result<HostedImage, ImageHostError>;
}

/// ImageKit upload-API client.
pub struct ImageKitClient {
    http: Client,
    private_key: String,
    upload_endpoint: String,
}

impl ImageKitClient {
    pub fn new(cfg: &ImageKitConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http,
            private_key: cfg.private_key.clone(),
            upload_endpoint: cfg.upload_endpoint.clone(),
        })
    }
}

#[async_trait]
impl ImageHost for ImageKitClient {
    async fn upload(&self, image: UploadedImage) -> Result<HostedImage, ImageHostError> {
        // ImageKit accepts the binary as a base64 text part.
        let encoded = general_purpose::STANDARD.encode(&image.bytes);
        let form = multipart::Form::new()
            .text("file", encoded)
            .text("fileName", image.file_name.clone())
            .text("folder", image.folder.clone())
            .text("useUniqueFileName", "false")
            .text("tags", image.tags.join(","));

        debug!(
            "posting {} bytes to image host as {}",
            image.bytes.len(),
            image.file_name
        );

        let response = self
            .http
            .post(&self.upload_endpoint)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".into());
            return Err(ImageHostError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<HostedImage>().await?)
    }
}
