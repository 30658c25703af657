use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub t: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
            t: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Message::new(Role::Tool, content)
    }

    /// System markers and tool records are preserved by the eviction rule in
    /// `club_sessions::store` even once the non-preserved tail is at cap.
    pub fn is_preserved(&self) -> bool {
        match self.role {
            Role::Tool => true,
            Role::System => {
                self.content.starts_with("AGENT_TRANSITION")
                    || self.content.starts_with("UPLOADED_FILE_PATH:")
            }
            _ => false,
        }
    }
}
