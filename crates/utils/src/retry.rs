// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::{error, warn};

pub enum RetryError {
    /// The operation may succeed if attempted again
    Retry(anyhow::Error),
    /// The operation failed for good
    Failure(anyhow::Error),
}

/// Wrap an error so that the operation is attempted again
pub fn to_retry(e: impl Into<anyhow::Error>) -> RetryError {
    RetryError::Retry(e.into())
}

pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    max_attempts: u32,
    initial_delay_ms: u64,
) -> anyhow::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    let mut current_attempt = 1;
    let mut delay_ms = initial_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(RetryError::Retry(e)) => {
                if current_attempt >= max_attempts {
                    return Err(anyhow::anyhow!(
                        "Operation failed after {} attempts. Last error: {}",
                        max_attempts,
                        e
                    ));
                }

                warn!(
                    "Attempt {}/{} failed, retrying in {}ms: {}",
                    current_attempt, max_attempts, delay_ms, e
                );

                sleep(Duration::from_millis(delay_ms)).await;
                current_attempt += 1;
                delay_ms *= 2; // Exponential backoff
            }
            Err(RetryError::Failure(e)) => {
                error!("Unrecoverable failure, returning to caller: {}", e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() -> anyhow::Result<()> {
        let calls = AtomicU32::new(0);
        let value = retry_with_backoff(
            || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if attempt < 3 {
                        Err(to_retry(anyhow::anyhow!("flaky")))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            5,
            10,
        )
        .await?;

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: anyhow::Result<()> = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(to_retry(anyhow::anyhow!("still down"))) }
            },
            3,
            10,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: anyhow::Result<()> = retry_with_backoff(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RetryError::Failure(anyhow::anyhow!("bad input"))) }
            },
            3,
            10,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
