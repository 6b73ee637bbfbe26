//! The persisted metadata record, one JSON document per uploaded asset.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full metadata for a single hosted image.
///
/// Field names follow the wire format consumed by the frontend: camelCase for
/// the constructed fields, snake_case for the client-supplied ones. Client
/// metadata keys beyond the required set are preserved verbatim in `extra`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetadataRecord {
    /// Validated upload filename; doubles as the storage key.
    pub filename: String,

    /// Location of the full asset at the external host.
    #[serde(rename = "imageUrl")]
    pub image_url: String,

    /// Thumbnail location; same as `imageUrl` when the host provides none.
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,

    /// The host's opaque asset identifier.
    #[serde(rename = "fileId")]
    pub file_id: String,

    pub prompt: String,
    pub style: String,
    pub aspect_ratio: String,
    pub model: String,

    #[serde(rename = "userId")]
    pub user_id: String,

    /// Client-declared creation time. ISO-8601 recommended, not validated.
    pub timestamp: String,

    /// Server-assigned write time, ISO-8601.
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: String,

    /// Any further client metadata keys, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
