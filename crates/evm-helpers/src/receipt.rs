// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::{
    network::ReceiptResponse,
    primitives::TxHash,
    rpc::types::TransactionReceipt,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tracing::debug;

/// The parts of a mined transaction the client cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// false when the call reverted
    pub success: bool,
}

impl From<&TransactionReceipt> for TxReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            transaction_hash: ReceiptResponse::transaction_hash(receipt),
            block_number: ReceiptResponse::block_number(receipt),
            gas_used: ReceiptResponse::gas_used(receipt),
            success: ReceiptResponse::status(receipt),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("no receipt for {hash} after {waited:?}")]
    Timeout { hash: TxHash, waited: Duration },
    #[error("failed to fetch receipt for {hash}: {reason}")]
    Rpc { hash: TxHash, reason: String },
}

/// Waits for a broadcast transaction to be mined.
#[async_trait]
pub trait ReceiptWaiter: Send + Sync {
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ReceiptError>;
}

/// Poll `fetch` every `poll_interval` until it yields a receipt.
///
/// The interval lives inside the returned future, so dropping the future stops
/// the polling. Without `max_wait` this waits for as long as it takes.
pub async fn poll_for_receipt<F, Fut>(
    hash: TxHash,
    poll_interval: Duration,
    max_wait: Option<Duration>,
    fetch: F,
) -> Result<TxReceipt, ReceiptError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = eyre::Result<Option<TxReceipt>>>,
{
    let poll = async {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match fetch().await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => debug!("receipt for {} not available yet", hash),
                Err(e) => {
                    return Err(ReceiptError::Rpc {
                        hash,
                        reason: e.to_string(),
                    })
                }
            }
        }
    };

    match max_wait {
        Some(waited) => timeout(waited, poll)
            .await
            .map_err(|_| ReceiptError::Timeout { hash, waited })?,
        None => poll.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn receipt(hash: TxHash) -> TxReceipt {
        TxReceipt {
            transaction_hash: hash,
            block_number: Some(7),
            gas_used: 21_000,
            success: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_mined() -> eyre::Result<()> {
        let hash = TxHash::repeat_byte(0xab);
        let polls = AtomicU32::new(0);

        let found = poll_for_receipt(hash, Duration::from_millis(500), None, || {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            async move { Ok((n >= 3).then(|| receipt(hash))) }
        })
        .await?;

        assert_eq!(found.block_number, Some(7));
        assert_eq!(polls.load(Ordering::SeqCst), 4);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_bounded() {
        let hash = TxHash::repeat_byte(0x01);
        let result = poll_for_receipt(
            hash,
            Duration::from_millis(100),
            Some(Duration::from_secs(2)),
            || async { Ok(None) },
        )
        .await;

        assert!(matches!(result, Err(ReceiptError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced() {
        let hash = TxHash::repeat_byte(0x02);
        let result = poll_for_receipt(hash, Duration::from_millis(1), None, || async {
            Err(eyre::eyre!("connection refused"))
        })
        .await;

        match result {
            Err(ReceiptError::Rpc { reason, .. }) => assert!(reason.contains("refused")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
