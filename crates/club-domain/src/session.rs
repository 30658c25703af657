use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Maximum length of the non-preserved tail of a session's history.
/// Preserved entries (see `Message::is_preserved`) may push the effective
/// length above this cap.
pub const MAX_HISTORY: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastAgent {
    None,
    Generic,
    NewRegistration,
    ReRegistration,
    Photo,
}

impl Default for LastAgent {
    fn default() -> Self {
        LastAgent::None
    }
}

/// A registration code once it has been parsed and validated.
/// Immutable once set on a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeContext {
    pub series: String,
    pub team: String,
    pub age_group: String,
    pub season: String,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    NewRegistration,
    ReRegistration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingUpload {
    pub temp_path: String,
    pub original_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub history: Vec<Message>,
    pub last_agent: LastAgent,
    pub routine_number: Option<u8>,
    pub code_context: Option<CodeContext>,
    pub pending_upload: Option<PendingUpload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Session {
            session_id: session_id.into(),
            history: Vec::new(),
            last_agent: LastAgent::None,
            routine_number: None,
            code_context: None,
            pending_upload: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Validates a client-supplied session id: opaque ASCII, `[A-Za-z0-9_-]`,
/// length in `1..=100`.
pub fn validate_session_id(id: &str) -> Result<(), crate::error::Error> {
    if id.is_empty() || id.len() > 100 {
        return Err(crate::error::Error::Integrity(format!(
            "invalid_session_id: length {} outside 1..=100",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(crate::error::Error::Integrity(
            "invalid_session_id: characters outside [A-Za-z0-9_-]".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_ids() {
        assert!(validate_session_id("s1").is_ok());
        assert!(validate_session_id("abc-123_XYZ").is_ok());
    }

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id(&"a".repeat(101)).is_err());
        assert!(validate_session_id(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(validate_session_id("has space").is_err());
        assert!(validate_session_id("has/slash").is_err());
        assert!(validate_session_id("emoji-🙂").is_err());
    }
}
