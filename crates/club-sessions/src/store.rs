use std::collections::HashMap;

use chrono::{DateTime, Utc};
use club_domain::error::{Error, Result};
use club_domain::message::Message;
use club_domain::session::{validate_session_id, CodeContext, LastAgent, PendingUpload, Session, MAX_HISTORY};
use club_domain::trace::TraceEvent;
use parking_lot::RwLock;

/// Bounded in-memory chat-history and per-session context store (spec C1).
///
/// All operations take the map's single write lock for the duration of the
/// mutation, so readers never observe a partially-updated session; this is
/// separate from (and composes with) the per-session turn lock the
/// dispatcher holds across a whole model round-trip.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().get(id).cloned()
    }

    /// Appends a message, creating the session if it is the first write,
    /// then evicts the oldest non-preserved entries until the non-preserved
    /// tail length is at most `MAX_HISTORY`.
    pub fn append(&self, id: &str, message: Message) -> Result<()> {
        validate_session_id(id)?;
        let mut sessions = self.sessions.write();
        let is_new = !sessions.contains_key(id);
        let session = sessions.entry(id.to_string()).or_insert_with(|| Session::new(id));
        session.history.push(message);
        evict(&mut session.history);
        session.updated_at = Utc::now();

        TraceEvent::SessionResolved {
            session_id: id.to_string(),
            is_new,
        }
        .emit();
        Ok(())
    }

    pub fn set_last_agent(&self, id: &str, agent: LastAgent) -> Result<()> {
        self.mutate(id, |s| s.last_agent = agent)
    }

    pub fn set_routine_number(&self, id: &str, number: Option<u8>) -> Result<()> {
        self.mutate(id, |s| s.routine_number = number)
    }

    pub fn set_code_context(&self, id: &str, context: CodeContext) -> Result<()> {
        self.mutate(id, |s| {
            if s.code_context.is_none() {
                s.code_context = Some(context.clone());
            }
        })
    }

    pub fn set_pending_upload(&self, id: &str, upload: Option<PendingUpload>) -> Result<()> {
        self.mutate(id, |s| s.pending_upload = upload)
    }

    fn mutate(&self, id: &str, f: impl FnOnce(&mut Session)) -> Result<()> {
        validate_session_id(id)?;
        let mut sessions = self.sessions.write();
        let session = sessions.entry(id.to_string()).or_insert_with(|| Session::new(id));
        f(session);
        session.updated_at = Utc::now();
        Ok(())
    }

    pub fn clear(&self, id: &str) -> Result<()> {
        validate_session_id(id)?;
        let mut sessions = self.sessions.write();
        sessions.insert(id.to_string(), Session::new(id));
        Ok(())
    }

    /// Removes sessions whose most recent message is older than
    /// `idle_timeout`. Returns the number of sessions removed.
    pub fn sweep(&self, now: DateTime<Utc>, idle_timeout: chrono::Duration) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|id, session| {
            let idle = now - session.last_activity();
            let keep = idle < idle_timeout;
            if !keep {
                TraceEvent::SessionSwept {
                    session_id: id.clone(),
                    idle_seconds: idle.num_seconds(),
                }
                .emit();
            }
            keep
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evicts the oldest non-preserved entries until the non-preserved tail is
/// at most `MAX_HISTORY` long. Preserved entries (system markers, tool
/// records) are never evicted and may push the effective length above the
/// cap.
fn evict(history: &mut Vec<Message>) {
    let non_preserved_count = history.iter().filter(|m| !m.is_preserved()).count();
    if non_preserved_count <= MAX_HISTORY {
        return;
    }
    let mut to_drop = non_preserved_count - MAX_HISTORY;
    let mut i = 0;
    let original_len = history.len();
    history.retain(|m| {
        if m.is_preserved() {
            return true;
        }
        i += 1;
        if to_drop > 0 {
            to_drop -= 1;
            false
        } else {
            true
        }
    });
    let evicted = original_len - history.len();
    if evicted > 0 {
        TraceEvent::HistoryEvicted {
            session_id: String::new(),
            evicted,
            remaining: history.len(),
        }
        .emit();
    }
}

pub fn invalid_session_id_error(id: &str) -> Error {
    Error::Integrity(format!("invalid_session_id: {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_domain::message::Role;

    #[test]
    fn append_creates_session_on_first_write() {
        let store = SessionStore::new();
        store.append("s1", Message::user("hi")).unwrap();
        let session = store.get("s1").unwrap();
        assert_eq!(session.history.len(), 1);
    }

    #[test]
    fn history_tail_never_exceeds_cap() {
        let store = SessionStore::new();
        for i in 0..100 {
            store.append("s1", Message::user(format!("msg {i}"))).unwrap();
        }
        let session = store.get("s1").unwrap();
        let non_preserved = session.history.iter().filter(|m| !m.is_preserved()).count();
        assert!(non_preserved <= MAX_HISTORY);
    }

    #[test]
    fn preserved_entries_survive_eviction() {
        let store = SessionStore::new();
        store.append("s1", Message::system("AGENT_TRANSITION:generic->new_registration")).unwrap();
        for i in 0..100 {
            store.append("s1", Message::user(format!("msg {i}"))).unwrap();
        }
        let session = store.get("s1").unwrap();
        assert!(session
            .history
            .iter()
            .any(|m| m.role == Role::System && m.content.starts_with("AGENT_TRANSITION")));
    }

    #[test]
    fn rejects_invalid_session_id() {
        let store = SessionStore::new();
        assert!(store.append("has space", Message::user("hi")).is_err());
    }

    #[test]
    fn sweep_removes_idle_sessions() {
        let store = SessionStore::new();
        store.append("s1", Message::user("hi")).unwrap();
        let removed = store.sweep(Utc::now() + chrono::Duration::hours(25), chrono::Duration::hours(24));
        assert_eq!(removed, 1);
        assert!(store.get("s1").is_none());
    }

    #[test]
    fn clear_resets_history() {
        let store = SessionStore::new();
        store.append("s1", Message::user("hi")).unwrap();
        store.clear("s1").unwrap();
        assert_eq!(store.get("s1").unwrap().history.len(), 0);
    }
}
