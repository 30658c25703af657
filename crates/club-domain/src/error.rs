use thiserror::Error;

/// Shared error taxonomy used across all `club-*` crates.
///
/// Variants map onto the kinds described for the core: validation errors are
/// recovered locally by the caller, adapter errors carry a retryable flag,
/// integrity errors are never retried, fatal errors abort startup.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("adapter error ({provider}, retryable={retryable}): {message}")]
    Adapter {
        provider: String,
        message: String,
        retryable: bool,
    },

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn adapter(provider: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Error::Adapter {
            provider: provider.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Whether an adapter error's underlying condition is worth retrying.
    /// Non-adapter errors are always treated as non-retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Adapter { retryable: true, .. } | Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
