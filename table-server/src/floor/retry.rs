//! Bounded retry around optimistic-concurrency failures
//!
//! Only [`FloorError::StaleState`] is retried. The failed commit already
//! refreshed the replica, so re-running the operation re-validates against
//! fresh state.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::error::FloorResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Exponential delay for the given retry (1-based) plus up to 50% jitter
    fn delay_for(&self, retry: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << retry.saturating_sub(1).min(16))
            .min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=(exp.as_millis() as u64 / 2).max(1));
        exp + Duration::from_millis(jitter_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(500),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempts are used up
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> FloorResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FloorResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying after stale state");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::floor::error::FloorError;
    use shared::message::Entity;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn retries_stale_state_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&fast(3), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(FloorError::StaleState {
                    entity: Entity::Table,
                    id: 1,
                })
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: FloorResult<()> = with_retry(&fast(3), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FloorError::StaleState {
                entity: Entity::Table,
                id: 1,
            })
        })
        .await;

        assert!(matches!(result, Err(FloorError::StaleState { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: FloorResult<()> = with_retry(&fast(5), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FloorError::NotOccupied { table_id: 1 })
        })
        .await;

        assert!(matches!(result, Err(FloorError::NotOccupied { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        let delay = policy.delay_for(8);
        assert!(delay >= Duration::from_millis(300));
        assert!(delay <= Duration::from_millis(450));
    }
}
