use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct UploadStatus {
    pub complete: bool,
    pub message: String,
    pub error: Option<String>,
}

impl UploadStatus {
    pub fn pending() -> Self {
        UploadStatus {
            complete: false,
            message: "processing".to_string(),
            error: None,
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        UploadStatus {
            complete: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        UploadStatus {
            complete: true,
            message: "failed".to_string(),
            error: Some(error.into()),
        }
    }
}

/// The only shared state in the async upload path (spec §9): a status record
/// per session, polled by the companion status endpoint.
#[derive(Default)]
pub struct UploadStatusStore {
    statuses: RwLock<HashMap<String, UploadStatus>>,
}

impl UploadStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, session_id: &str, status: UploadStatus) {
        self.statuses.write().insert(session_id.to_string(), status);
    }

    pub fn get(&self, session_id: &str) -> Option<UploadStatus> {
        self.statuses.read().get(session_id).cloned()
    }

    pub fn clear(&self, session_id: &str) {
        self.statuses.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let store = UploadStatusStore::new();
        store.set("s1", UploadStatus::pending());
        assert!(!store.get("s1").unwrap().complete);
        store.set("s1", UploadStatus::done("ok"));
        assert!(store.get("s1").unwrap().complete);
    }
}
