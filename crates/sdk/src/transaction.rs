// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::error::TxFailure;
use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use shade_evm_helpers::TxReceipt;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[default]
    Idle,
    Preparing,
    Pending,
    Confirming,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }

    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            TransactionStatus::Preparing | TransactionStatus::Pending | TransactionStatus::Confirming
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Snapshot of one action's transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionState {
    pub status: TransactionStatus,
    pub hash: Option<TxHash>,
    pub error: Option<TxFailure>,
    pub receipt: Option<TxReceipt>,
}

/// Token for one run of a [`TransactionStateMachine`], handed out by `begin`.
///
/// Transitions carry it so a run that was reset away can no longer touch the
/// state of the run that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(u64);

/// Idle -> Preparing -> Pending -> Confirming -> {Success, Failed}.
///
/// Transitions out of the wrong state, or for a run that is no longer current,
/// are refused and return false. Observers get every accepted transition
/// through [`TransactionStateMachine::subscribe`].
pub struct TransactionStateMachine {
    label: String,
    state: watch::Sender<TransactionState>,
    // only changed while the watch value is locked
    generation: AtomicU64,
}

impl TransactionStateMachine {
    pub fn new(label: impl Into<String>) -> Self {
        let (state, _) = watch::channel(TransactionState::default());
        Self {
            label: label.into(),
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> TransactionState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> TransactionStatus {
        self.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<TransactionState> {
        self.state.subscribe()
    }

    /// The state as seen by `run`, or `None` once the run was reset away.
    pub fn snapshot(&self, run: RunId) -> Option<TransactionState> {
        let state = self.state.borrow();
        self.is_current(run).then(|| state.clone())
    }

    pub fn is_current(&self, run: RunId) -> bool {
        self.generation.load(Ordering::SeqCst) == run.0
    }

    /// Idle -> Preparing. The only way into a run; at most one caller wins.
    pub fn begin(&self) -> Option<RunId> {
        let mut run = None;
        let mut current = TransactionStatus::Idle;
        self.state.send_if_modified(|state| {
            current = state.status;
            if state.status != TransactionStatus::Idle {
                return false;
            }
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            run = Some(RunId(generation));
            *state = TransactionState {
                status: TransactionStatus::Preparing,
                ..Default::default()
            };
            true
        });
        match run {
            Some(_) => info!("[{}] Idle -> Preparing", self.label),
            None => warn!("[{}] begin refused in state {}", self.label, current),
        }
        run
    }

    pub fn submitted(&self, run: RunId, hash: TxHash) -> bool {
        self.transition(run, &[TransactionStatus::Preparing], |s| {
            s.status = TransactionStatus::Pending;
            s.hash = Some(hash);
        })
    }

    pub fn confirming(&self, run: RunId) -> bool {
        self.transition(run, &[TransactionStatus::Pending], |s| {
            s.status = TransactionStatus::Confirming;
        })
    }

    pub fn succeeded(&self, run: RunId, receipt: TxReceipt) -> bool {
        self.transition(run, &[TransactionStatus::Confirming], |s| {
            s.status = TransactionStatus::Success;
            s.receipt = Some(receipt);
        })
    }

    /// Any in-flight state of `run` -> Failed.
    pub fn failed(&self, run: RunId, failure: TxFailure) -> bool {
        self.transition(
            run,
            &[
                TransactionStatus::Preparing,
                TransactionStatus::Pending,
                TransactionStatus::Confirming,
            ],
            |s| {
                s.status = TransactionStatus::Failed;
                s.error = Some(failure);
            },
        )
    }

    /// Back to Idle from anywhere, dropping hash, error and receipt. Any run in
    /// flight is abandoned.
    pub fn reset(&self) {
        let mut previous = TransactionStatus::Idle;
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            previous = state.status;
            *state = TransactionState::default();
        });
        if previous != TransactionStatus::Idle {
            info!("[{}] {} -> Idle (reset)", self.label, previous);
        }
    }

    fn transition(
        &self,
        run: RunId,
        from: &[TransactionStatus],
        apply: impl FnOnce(&mut TransactionState),
    ) -> bool {
        let mut stale = false;
        let mut refused = None;
        let mut moved = None;
        self.state.send_if_modified(|state| {
            if !self.is_current(run) {
                stale = true;
                return false;
            }
            if !from.contains(&state.status) {
                refused = Some(state.status);
                return false;
            }
            let previous = state.status;
            apply(state);
            moved = Some((previous, state.status));
            true
        });

        match (moved, refused) {
            (Some((previous, next)), _) => {
                info!("[{}] {} -> {}", self.label, previous, next);
                true
            }
            (None, Some(current)) => {
                warn!("[{}] transition refused in state {}", self.label, current);
                false
            }
            (None, None) => {
                if stale {
                    debug!("[{}] ignoring transition of an abandoned run", self.label);
                }
                false
            }
        }
    }
}
