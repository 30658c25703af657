use crate::error::PhotoError;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/heic", "image/heif"];

/// Entry validation for both upload endpoints (spec §4.8): content type and
/// size only. The session is left untouched on failure.
pub fn validate_upload(content_type: &str, size_bytes: usize) -> Result<(), PhotoError> {
    if !ACCEPTED_CONTENT_TYPES.contains(&content_type.to_ascii_lowercase().as_str()) {
        return Err(PhotoError::UnsupportedFormat);
    }
    if size_bytes == 0 || size_bytes > MAX_UPLOAD_BYTES {
        return Err(PhotoError::UnsupportedFormat);
    }
    Ok(())
}

pub fn is_heic(content_type: &str) -> bool {
    matches!(content_type.to_ascii_lowercase().as_str(), "image/heic" | "image/heif")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_jpeg_under_cap() {
        assert!(validate_upload("image/jpeg", 1024).is_ok());
    }

    #[test]
    fn rejects_oversized() {
        assert_eq!(validate_upload("image/jpeg", MAX_UPLOAD_BYTES + 1).unwrap_err(), PhotoError::UnsupportedFormat);
    }

    #[test]
    fn rejects_unknown_content_type() {
        assert_eq!(validate_upload("application/pdf", 1024).unwrap_err(), PhotoError::UnsupportedFormat);
    }

    #[test]
    fn heic_detection() {
        assert!(is_heic("image/HEIC"));
        assert!(!is_heic("image/jpeg"));
    }
}
