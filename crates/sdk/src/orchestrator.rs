// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    error::{SdkError, TxFailure},
    transaction::{RunId, TransactionState, TransactionStateMachine, TransactionStatus},
};
use alloy::primitives::TxHash;
use shade_evm_helpers::ReceiptWaiter;
use std::{future::Future, sync::Arc};
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// Outcome of [`TransactionOrchestrator::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// The orchestrator was not Idle; nothing was submitted.
    Skipped(TransactionStatus),
    Finished(TransactionState),
    /// `reset` was called while this run was in flight. Its transaction may
    /// still be mined but is no longer tracked.
    Abandoned,
}

impl Execution {
    pub fn state(&self) -> Option<&TransactionState> {
        match self {
            Execution::Finished(state) => Some(state),
            Execution::Skipped(_) | Execution::Abandoned => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Execution::Finished(s) if s.status == TransactionStatus::Success)
    }
}

/// Drives one kind of ledger write through its lifecycle.
pub struct TransactionOrchestrator {
    machine: TransactionStateMachine,
    receipts: Arc<dyn ReceiptWaiter>,
}

impl TransactionOrchestrator {
    pub fn new(label: impl Into<String>, receipts: Arc<dyn ReceiptWaiter>) -> Self {
        Self {
            machine: TransactionStateMachine::new(label),
            receipts,
        }
    }

    /// Run `submit` and follow the resulting transaction until it is mined.
    ///
    /// `submit` does the preparation (encryption, authorization) and the write
    /// itself, returning the hash once the node accepted the transaction.
    #[instrument(skip_all, fields(action = %self.machine.label()))]
    pub async fn execute<F, Fut>(&self, submit: F) -> Execution
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TxHash, SdkError>>,
    {
        let Some(run) = self.machine.begin() else {
            let status = self.machine.status();
            warn!("{} already {}; reset before executing again", self.label(), status);
            return Execution::Skipped(status);
        };

        let hash = match submit().await {
            Ok(hash) => hash,
            Err(err) => return self.fail(run, &err),
        };
        if !self.machine.submitted(run, hash) || !self.machine.confirming(run) {
            return self.finish(run);
        }

        match self.receipts.wait_for_receipt(hash).await {
            Ok(receipt) if receipt.success => {
                info!(
                    "{} mined in block {:?}",
                    self.label(),
                    receipt.block_number
                );
                self.machine.succeeded(run, receipt);
                self.finish(run)
            }
            Ok(receipt) => self.fail(
                run,
                &SdkError::ChainWriteFailed {
                    reason: format!(
                        "transaction {} reverted in block {:?}",
                        hash, receipt.block_number
                    ),
                },
            ),
            Err(err) => self.fail(run, &SdkError::from(err)),
        }
    }

    fn fail(&self, run: RunId, err: &SdkError) -> Execution {
        let failure = TxFailure::from(err);
        if failure.is_user_rejection() {
            info!("{}: {}", self.label(), failure);
        } else {
            warn!("{} failed: {}", self.label(), err);
        }
        self.machine.failed(run, failure);
        self.finish(run)
    }

    fn finish(&self, run: RunId) -> Execution {
        match self.machine.snapshot(run) {
            Some(state) => Execution::Finished(state),
            None => {
                info!("{} was reset while in flight; result discarded", self.label());
                Execution::Abandoned
            }
        }
    }

    pub fn reset(&self) {
        self.machine.reset();
    }

    pub fn state(&self) -> TransactionState {
        self.machine.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionState> {
        self.machine.subscribe()
    }

    pub fn label(&self) -> &str {
        self.machine.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use async_trait::async_trait;
    use shade_evm_helpers::{ReceiptError, TxReceipt};
    use std::time::Duration;

    struct FixedReceipt(bool);

    #[async_trait]
    impl ReceiptWaiter for FixedReceipt {
        async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ReceiptError> {
            Ok(TxReceipt {
                transaction_hash: hash,
                block_number: Some(10),
                gas_used: 80_000,
                success: self.0,
            })
        }
    }

    struct NeverMined;

    #[async_trait]
    impl ReceiptWaiter for NeverMined {
        async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ReceiptError> {
            Err(ReceiptError::Timeout {
                hash,
                waited: Duration::from_secs(30),
            })
        }
    }

    #[tokio::test]
    async fn test_reverted_receipt_fails() {
        let orchestrator = TransactionOrchestrator::new("close", Arc::new(FixedReceipt(false)));
        let hash = TxHash::repeat_byte(3);

        let outcome = orchestrator.execute(|| async move { Ok(hash) }).await;
        let state = outcome.state().cloned().unwrap();
        assert_eq!(state.status, TransactionStatus::Failed);
        assert_eq!(state.hash, Some(hash));
        assert_eq!(state.error.unwrap().kind, FailureKind::ChainWriteFailed);
    }

    #[tokio::test]
    async fn test_receipt_timeout_is_classified() {
        let orchestrator = TransactionOrchestrator::new("reveal", Arc::new(NeverMined));
        let outcome = orchestrator
            .execute(|| async { Ok(TxHash::repeat_byte(4)) })
            .await;
        let state = outcome.state().cloned().unwrap();
        assert_eq!(state.error.unwrap().kind, FailureKind::ReceiptTimeout);
    }

    #[tokio::test]
    async fn test_terminal_orchestrator_skips_until_reset() {
        let orchestrator = TransactionOrchestrator::new("open", Arc::new(FixedReceipt(true)));
        assert!(orchestrator
            .execute(|| async { Ok(TxHash::repeat_byte(1)) })
            .await
            .is_success());

        let skipped = orchestrator
            .execute(|| async { Ok(TxHash::repeat_byte(2)) })
            .await;
        assert_eq!(skipped, Execution::Skipped(TransactionStatus::Success));

        orchestrator.reset();
        assert_eq!(orchestrator.state().status, TransactionStatus::Idle);
        assert!(orchestrator
            .execute(|| async { Ok(TxHash::repeat_byte(2)) })
            .await
            .is_success());
    }

    #[tokio::test]
    async fn test_submit_error_never_escapes() {
        let orchestrator = TransactionOrchestrator::new("open", Arc::new(FixedReceipt(true)));
        let outcome = orchestrator
            .execute(|| async { Err(SdkError::ChainWriteRejected) })
            .await;
        let state = outcome.state().cloned().unwrap();
        assert_eq!(state.status, TransactionStatus::Failed);
        assert!(state.hash.is_none());
        let error = state.error.unwrap();
        assert!(error.is_user_rejection());
        assert_eq!(error.message, "Transaction rejected by user");
    }
}
