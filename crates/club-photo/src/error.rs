use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoError {
    UnsupportedFormat,
    ConversionFailed,
    StoreUnavailable,
    UploadInProgress,
}

impl PhotoError {
    pub fn kind(self) -> &'static str {
        match self {
            PhotoError::UnsupportedFormat => "unsupported_format",
            PhotoError::ConversionFailed => "conversion_failed",
            PhotoError::StoreUnavailable => "store_unavailable",
            PhotoError::UploadInProgress => "upload_in_progress",
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

impl std::error::Error for PhotoError {}
