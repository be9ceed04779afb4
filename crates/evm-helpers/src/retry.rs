// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use shade_utils::{retry_with_backoff, RetryError};
use std::future::Future;

const RETRY_INITIAL_DELAY_MS: u64 = 500;

/// Errors that are worth another attempt when reading contract state.
pub const TRANSIENT_READ_ERRORS: &[&str] = &[
    "timed out",
    "connection",
    "rate limit",
    "429",
    "502",
    "503",
    "header not found",
];

fn should_retry_error(error: &str, retry_on_errors: &[&str]) -> bool {
    if retry_on_errors.is_empty() {
        return true;
    }
    let error = error.to_lowercase();
    retry_on_errors.iter().any(|code| error.contains(code))
}

/// Run a read-only call, retrying with backoff when the error looks transient.
///
/// Writes must never go through here: resending a transaction is the wallet's call.
pub async fn call_with_retry<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    retry_on_errors: &[&str],
    read_fn: F,
) -> eyre::Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = eyre::Result<T>>,
{
    retry_with_backoff(
        || {
            let fut = read_fn();
            async move {
                fut.await.map_err(|e| {
                    let e = anyhow::anyhow!("{operation_name}: {e}");
                    if should_retry_error(&e.to_string(), retry_on_errors) {
                        RetryError::Retry(e)
                    } else {
                        RetryError::Failure(e)
                    }
                })
            }
        },
        max_attempts.max(1),
        RETRY_INITIAL_DELAY_MS,
    )
    .await
    .map_err(|e| eyre::eyre!("{e}"))
}
