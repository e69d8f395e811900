//! Retry loops for startup dependencies.
//!
//! # Responsibilities
//! - Keep retrying an operation the service cannot run without
//! - Log every failure with the delay before the next attempt
//!
//! # Design Decisions
//! - Never gives up: cancellation comes from the caller dropping the future
//!   (e.g. a shutdown signal racing the startup sequence)

use std::fmt::Display;
use std::future::Future;

use crate::resilience::backoff::Backoff;

/// Run `op` until it succeeds, sleeping per `backoff` between failures.
pub async fn retry_forever<T, E, F, Fut>(what: &str, backoff: Backoff, mut op: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "{} succeeded after retrying", what);
                }
                return value;
            }
            Err(e) => {
                let delay = backoff.delay(attempt);
                tracing::error!(attempt, error = %e, retry_in = ?delay, "{} failed", what);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value = retry_forever("flaky", Backoff::Fixed(Duration::from_millis(5)), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Err("not yet")
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cancelled_by_dropping() {
        let never = retry_forever("down", Backoff::Fixed(Duration::from_millis(5)), || async {
            Err::<(), _>("unreachable")
        });
        let outcome = tokio::time::timeout(Duration::from_millis(50), never).await;
        assert!(outcome.is_err());
    }
}
