//! Filename sanitization and validation.
//!
//! Upload filenames become storage keys verbatim, so everything that reaches
//! the store must survive the strict check here. The read path deliberately
//! applies only [`sanitize`] (see the metadata handler): fetching a name that
//! would never pass upload validation simply 404s.

use std::fmt;
use thiserror::Error;

/// Extensions accepted for uploaded images, lowercase only.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilenameError {
    #[error("Invalid filename format")]
    InvalidFormat,
}

/// A filename that passed [`validate`] and is safe to use as a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFilename(String);

impl ValidatedFilename {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitize `raw` and require the canonical shape
/// `IMG_<alphanumeric/underscore/hyphen>.<png|jpg|jpeg|webp>`.
///
/// The original (unsanitized) value is never used downstream.
pub fn validate(raw: &str) -> Result<ValidatedFilename, FilenameError> {
    let name = sanitize(raw);

    let rest = name
        .strip_prefix("IMG_")
        .ok_or(FilenameError::InvalidFormat)?;
    let (stem, extension) = rest.rsplit_once('.').ok_or(FilenameError::InvalidFormat)?;

    if stem.is_empty()
        || !stem
            .chars()
            .all(|c| matches!(c, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-'))
    {
        return Err(FilenameError::InvalidFormat);
    }
    if !ALLOWED_EXTENSIONS.contains(&extension) {
        return Err(FilenameError::InvalidFormat);
    }

    Ok(ValidatedFilename(name))
}
