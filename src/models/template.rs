//! The reduced projection of a record returned by the listing endpoint.

use crate::models::record::MetadataRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary shape for `GET /templates`.
#[derive(Serialize, Clone, Debug)]
pub struct TemplateSummary {
    /// The record's filename, or the storage key when the filename is blank.
    pub id: String,

    #[serde(rename = "imageUrl")]
    pub image_url: String,

    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,

    pub prompt: String,
    pub style: String,
    pub aspect_ratio: String,
    pub model: String,

    /// Client timestamp, falling back to the server upload time.
    pub timestamp: String,
}

impl TemplateSummary {
    /// Project a stored record, `key` being the record's file stem on disk.
    pub fn from_record(key: &str, record: &MetadataRecord) -> Self {
        let id = if record.filename.is_empty() {
            key.to_string()
        } else {
            record.filename.clone()
        };
        let thumbnail_url = if record.thumbnail_url.is_empty() {
            record.image_url.clone()
        } else {
            record.thumbnail_url.clone()
        };
        let timestamp = if record.timestamp.is_empty() {
            record.uploaded_at.clone()
        } else {
            record.timestamp.clone()
        };

        Self {
            id,
            image_url: record.image_url.clone(),
            thumbnail_url,
            prompt: record.prompt.clone(),
            style: record.style.clone(),
            aspect_ratio: record.aspect_ratio.clone(),
            model: record.model.clone(),
            timestamp,
        }
    }

    /// Sort key for newest-first ordering. Records whose timestamp does not
    /// parse as an ISO-8601 date count as epoch zero and land at the end.
    pub fn recency(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::cmp::Reverse;

    fn record(timestamp: &str) -> MetadataRecord {
        MetadataRecord {
            filename: "IMG_fixture.png".into(),
            image_url: "https://cdn.example/full.png".into(),
            thumbnail_url: String::new(),
            file_id: "abc123".into(),
            prompt: "a lighthouse at dusk".into(),
            style: "photorealistic".into(),
            aspect_ratio: "1:1".into(),
            model: "flux-pro".into(),
            user_id: "user-1".into(),
            timestamp: timestamp.into(),
            uploaded_at: "2026-08-01T10:00:00.000Z".into(),
            extra: Map::new(),
        }
    }

    #[test]
    fn missing_thumbnail_falls_back_to_image_url() {
        let summary = TemplateSummary::from_record("IMG_fixture.png", &record("2026-08-02T09:00:00Z"));
        assert_eq!(summary.thumbnail_url, summary.image_url);
    }

    #[test]
    fn missing_timestamp_falls_back_to_upload_time() {
        let summary = TemplateSummary::from_record("IMG_fixture.png", &record(""));
        assert_eq!(summary.timestamp, "2026-08-01T10:00:00.000Z");
    }

    #[test]
    fn unparseable_timestamps_sort_last() {
        let mut summaries = vec![
            TemplateSummary::from_record("a", &record("not a date")),
            TemplateSummary::from_record("b", &record("2026-08-03T12:00:00Z")),
            TemplateSummary::from_record("c", &record("2026-08-05T12:00:00Z")),
        ];
        summaries.sort_by_key(|s| Reverse(s.recency()));

        let order: Vec<&str> = summaries.iter().map(|s| s.timestamp.as_str()).collect();
        assert_eq!(
            order,
            ["2026-08-05T12:00:00Z", "2026-08-03T12:00:00Z", "not a date"]
        );
    }
}
