//! crates/playlist_core/src/validation.rs
//!
//! Local checks a file must pass before it is uploaded.

use crate::domain::DocumentFile;
use crate::error::ValidationError;

pub const ALLOWED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "text/plain",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// 10 MiB; a file of exactly this size is accepted.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// Checks the type first, then the size.
pub fn validate(file: &DocumentFile) -> Result<(), ValidationError> {
    if !is_allowed_mime_type(&file.mime_type) {
        return Err(ValidationError::UnsupportedType(file.mime_type.clone()));
    }
    let size = file.size_bytes();
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}
