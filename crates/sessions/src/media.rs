//! Outbound media rules: MIME allow-list and size cap, checked before any
//! session is consulted.

use serde_json::{Value, json};

use crate::error::{Error, Result};

/// Hard cap on outbound media payloads.
pub const MAX_MEDIA_BYTES: usize = 16 * 1024 * 1024;

pub const IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

pub const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "text/csv",
];

pub const AUDIO_TYPES: &[&str] = &["audio/mpeg", "audio/wav", "audio/ogg"];

pub const VIDEO_TYPES: &[&str] = &["video/mp4", "video/avi", "video/mov", "video/wmv"];

/// Whether a MIME type is on the allow-list. Parameters (`;codecs=...`) are
/// ignored.
#[must_use]
pub fn is_allowed(mime_type: &str) -> bool {
    let base = mime_type.split(';').next().unwrap_or(mime_type).trim();
    IMAGE_TYPES.contains(&base)
        || DOCUMENT_TYPES.contains(&base)
        || AUDIO_TYPES.contains(&base)
        || VIDEO_TYPES.contains(&base)
}

/// Validate an outbound payload against the allow-list and size cap.
pub fn validate(mime_type: &str, size: usize) -> Result<()> {
    if !is_allowed(mime_type) {
        return Err(Error::UnsupportedMediaType {
            mime_type: mime_type.to_string(),
        });
    }
    if size > MAX_MEDIA_BYTES {
        return Err(Error::PayloadTooLarge {
            size,
            limit: MAX_MEDIA_BYTES,
        });
    }
    Ok(())
}

/// Static capability descriptor served on the media-types route.
#[must_use]
pub fn capabilities() -> Value {
    json!({
        "supportedTypes": {
            "images": IMAGE_TYPES,
            "documents": DOCUMENT_TYPES,
            "audio": AUDIO_TYPES,
            "video": VIDEO_TYPES,
        },
        "limits": {
            "maxFileSize": "16MB",
            "note": "WhatsApp applies its own per-type limits on top of this",
        },
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_covers_all_categories() {
        for mime in ["image/png", "application/pdf", "text/csv", "audio/ogg", "video/mp4"] {
            assert!(is_allowed(mime), "{mime} should be allowed");
        }
        assert!(!is_allowed("application/x-msdownload"));
        assert!(!is_allowed("image/tiff"));
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert!(is_allowed("audio/ogg;codecs=opus"));
    }

    #[test]
    fn validate_checks_type_before_size() {
        assert!(validate("image/png", 1024).is_ok());
        assert!(matches!(
            validate("image/tiff", 1024).unwrap_err(),
            Error::UnsupportedMediaType { .. }
        ));
        assert!(matches!(
            validate("image/png", MAX_MEDIA_BYTES + 1).unwrap_err(),
            Error::PayloadTooLarge { .. }
        ));
        assert!(validate("image/png", MAX_MEDIA_BYTES).is_ok());
    }
}
