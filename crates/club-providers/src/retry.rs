//! Reusable retry/backoff helper (spec §9: "a reusable helper parameterized
//! by `(attempts, base_delay, classify_error)`"), used by both the model
//! call loop and adapter calls.

use std::future::Future;
use std::time::Duration;

use club_domain::error::Error;

/// Runs `op` up to `attempts` times. Between attempts, sleeps
/// `base_delay * 2^attempt` (skipped after the last attempt). Stops early
/// (without retrying) if `classify_retryable` returns `false` for the error.
pub async fn with_backoff<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    classify_retryable: impl Fn(&Error) -> bool,
    mut op: F,
) -> Result<T, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut last_err = None;
    for attempt in 0..attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let retryable = classify_retryable(&e);
                last_err = Some(e);
                if !retryable || attempt + 1 == attempts {
                    break;
                }
                let wait = base_delay * 2u32.pow(attempt);
                tokio::time::sleep(wait).await;
            }
        }
    }
    Err(last_err.unwrap_or_else(|| Error::Other("retry loop ran zero times".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, Error> = with_backoff(
            3,
            Duration::from_millis(1),
            |_| true,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_attempts_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, Error> = with_backoff(
            3,
            Duration::from_millis(1),
            |_| true,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::adapter("test", "boom", true)) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, Error> = with_backoff(
            3,
            Duration::from_millis(1),
            |e| e.is_retryable(),
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::adapter("test", "bad request", false)) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
