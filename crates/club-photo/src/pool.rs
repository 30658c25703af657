use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::error::PhotoError;

/// Bounds total concurrent photo-processing work and rejects a second
/// in-flight upload for the same session (spec §4.8 Concurrency). Mirrors
/// the teacher's background-task-per-session shape (`ProcessManager`)
/// without the process-registry bookkeeping that doesn't apply here.
pub struct PhotoWorkerPool {
    semaphore: Arc<Semaphore>,
    in_flight: Mutex<HashSet<String>>,
}

impl PhotoWorkerPool {
    pub fn new(capacity: usize) -> Self {
        PhotoWorkerPool {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Reserve a worker slot for `session_id`. Errors with
    /// `PhotoError::UploadInProgress` if that session already has an
    /// upload running; otherwise awaits a free pool slot.
    pub async fn reserve(&self, session_id: &str) -> Result<PhotoWorkerGuard, PhotoError> {
        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(session_id.to_string()) {
                return Err(PhotoError::UploadInProgress);
            }
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore never closed");

        Ok(PhotoWorkerGuard {
            pool: self,
            session_id: session_id.to_string(),
            _permit: permit,
        })
    }

    fn release(&self, session_id: &str) {
        self.in_flight.lock().remove(session_id);
    }
}

pub struct PhotoWorkerGuard<'a> {
    pool: &'a PhotoWorkerPool,
    session_id: String,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl Drop for PhotoWorkerGuard<'_> {
    fn drop(&mut self) {
        self.pool.release(&self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_upload_for_same_session_rejected() {
        let pool = PhotoWorkerPool::new(2);
        let _guard = pool.reserve("s1").await.unwrap();
        let err = pool.reserve("s1").await.unwrap_err();
        assert_eq!(err, PhotoError::UploadInProgress);
    }

    #[tokio::test]
    async fn different_sessions_run_concurrently() {
        let pool = PhotoWorkerPool::new(2);
        let _g1 = pool.reserve("s1").await.unwrap();
        let g2 = pool.reserve("s2").await.unwrap();
        drop(g2);
    }

    #[tokio::test]
    async fn releasing_allows_reuse() {
        let pool = PhotoWorkerPool::new(1);
        {
            let _guard = pool.reserve("s1").await.unwrap();
        }
        assert!(pool.reserve("s1").await.is_ok());
    }
}
