//! Per-session turn serialization (spec §4.7/§5). Ported from the gateway's
//! session-lock pattern: one semaphore per session key, acquired
//! non-blockingly with a short queue; overflow returns `SessionBusy`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
pub struct SessionBusy;

impl std::fmt::Display for SessionBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session is busy — a turn is already in progress")
    }
}

impl std::error::Error for SessionBusy {}

struct SessionLock {
    semaphore: Arc<Semaphore>,
    /// Whether a second caller is already queued behind the current holder.
    /// Only one queued waiter is allowed; a further caller overflows the
    /// short queue and is rejected with `SessionBusy` immediately.
    waiting: Arc<AtomicBool>,
}

impl Clone for SessionLock {
    fn clone(&self) -> Self {
        SessionLock {
            semaphore: self.semaphore.clone(),
            waiting: self.waiting.clone(),
        }
    }
}

pub struct SessionLockMap {
    locks: Mutex<HashMap<String, SessionLock>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        SessionLockMap {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the lock for `session_id`. Tries a non-blocking acquire
    /// first; if the permit is already held and nobody is queued yet, waits
    /// for it (a queue of depth one); if someone is already queued, returns
    /// `SessionBusy` immediately instead of growing the queue further.
    pub async fn acquire(&self, session_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| SessionLock {
                    semaphore: Arc::new(Semaphore::new(1)),
                    waiting: Arc::new(AtomicBool::new(false)),
                })
                .clone()
        };

        if let Ok(permit) = lock.semaphore.clone().try_acquire_owned() {
            return Ok(permit);
        }

        if lock.waiting.swap(true, Ordering::SeqCst) {
            return Err(SessionBusy);
        }

        let result = lock.semaphore.clone().acquire_owned().await.map_err(|_| SessionBusy);
        lock.waiting.store(false, Ordering::SeqCst);
        result
    }

    pub fn session_count(&self) -> usize {
        self.locks.try_lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Drops lock entries that are not currently held, bounding memory for
    /// long-lived processes with many historical sessions.
    pub async fn prune_idle(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| lock.semaphore.available_permits() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();
        let permit1 = map.acquire("s1").await.unwrap();
        drop(permit1);
        let _permit2 = map.acquire("s1").await.unwrap();
    }

    #[tokio::test]
    async fn different_sessions_concurrent() {
        let map = SessionLockMap::new();
        let _p1 = map.acquire("s1").await.unwrap();
        let _p2 = map.acquire("s2").await.unwrap();
    }

    #[tokio::test]
    async fn same_session_waits() {
        let map = Arc::new(SessionLockMap::new());
        let permit = map.acquire("s1").await.unwrap();

        let map2 = map.clone();
        let waiter = tokio::spawn(async move { map2.acquire("s1").await.is_ok() });

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(permit);

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn third_caller_overflows_queue() {
        let map = Arc::new(SessionLockMap::new());
        let _permit = map.acquire("s1").await.unwrap();

        let map2 = map.clone();
        let _waiter = tokio::spawn(async move { map2.acquire("s1").await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let overflow = map.acquire("s1").await;
        assert!(overflow.is_err());
    }
}
