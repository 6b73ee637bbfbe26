//! Core data models for the image metadata backend.
//!
//! `MetadataRecord` is the single persisted entity, one pretty-printed JSON
//! file per uploaded asset. `TemplateSummary` is its read-side projection for
//! the listing endpoint. Both serialize via `serde` in the wire format the
//! frontend expects.

pub mod record;
pub mod template;
