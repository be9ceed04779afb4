// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::utils::{locked, tx_hash};
use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use eyre::{bail, eyre, Result};
use shade_evm_helpers::{
    contracts::{Position, TradingRead, TradingWrite},
    ReceiptError, ReceiptWaiter, TxReceipt, WalletError,
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerWrite {
    Open {
        is_long: B256,
        size: B256,
        input_proof: Bytes,
        leverage: U256,
    },
    Close(U256),
    Reveal(U256),
}

/// How the next receipts come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiptOutcome {
    #[default]
    Mined,
    Reverted,
    TimedOut,
}

#[derive(Debug)]
struct LedgerState {
    owner: Address,
    positions: BTreeMap<U256, Position>,
    next_position: u64,
    sent: u64,
    writes: Vec<LedgerWrite>,
    reject_writes: bool,
    write_error: Option<String>,
    read_error: Option<String>,
    receipt_outcome: ReceiptOutcome,
    receipt_delay: Option<Duration>,
    mark_price: U256,
    paused: bool,
}

/// In-memory trading contract plus the node that mines its transactions.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    /// Positions opened through this ledger belong to `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                owner,
                positions: BTreeMap::new(),
                next_position: 1,
                sent: 0,
                writes: Vec::new(),
                reject_writes: false,
                write_error: None,
                read_error: None,
                receipt_outcome: ReceiptOutcome::Mined,
                receipt_delay: None,
                mark_price: U256::ZERO,
                paused: false,
            })),
        }
    }

    /// Writes fail as if the user declined them in the wallet.
    pub fn reject_writes(&self, reject: bool) {
        locked(&self.state).reject_writes = reject;
    }

    pub fn fail_writes(&self, reason: Option<&str>) {
        locked(&self.state).write_error = reason.map(str::to_string);
    }

    pub fn fail_reads(&self, reason: Option<&str>) {
        locked(&self.state).read_error = reason.map(str::to_string);
    }

    pub fn set_receipt_outcome(&self, outcome: ReceiptOutcome) {
        locked(&self.state).receipt_outcome = outcome;
    }

    /// Time a transaction takes to be mined.
    pub fn set_receipt_delay(&self, delay: Option<Duration>) {
        locked(&self.state).receipt_delay = delay;
    }

    pub fn set_mark_price(&self, price: U256) {
        locked(&self.state).mark_price = price;
    }

    pub fn set_paused(&self, paused: bool) {
        locked(&self.state).paused = paused;
    }

    pub fn writes(&self) -> Vec<LedgerWrite> {
        locked(&self.state).writes.clone()
    }

    pub fn position(&self, id: U256) -> Option<Position> {
        locked(&self.state).positions.get(&id).cloned()
    }

    fn check_read(&self) -> Result<()> {
        match &locked(&self.state).read_error {
            Some(reason) => Err(eyre!("{reason}")),
            None => Ok(()),
        }
    }

    fn record_write(&self, write: LedgerWrite) -> Result<TxHash> {
        let mut state = locked(&self.state);
        if state.reject_writes {
            return Err(eyre::Report::new(WalletError::Rejected).wrap_err("sending transaction"));
        }
        if let Some(reason) = &state.write_error {
            bail!("{reason}");
        }

        match &write {
            LedgerWrite::Open {
                is_long,
                size,
                leverage,
                ..
            } => {
                let id = U256::from(state.next_position);
                state.next_position += 1;
                let position = Position {
                    owner: state.owner,
                    isLong: *is_long,
                    size: *size,
                    leverage: *leverage,
                    entryPrice: state.mark_price,
                    isOpen: true,
                    isRevealed: false,
                };
                state.positions.insert(id, position);
            }
            LedgerWrite::Close(id) => match state.positions.get_mut(id) {
                Some(position) => position.isOpen = false,
                None => bail!("execution reverted: unknown position {id}"),
            },
            LedgerWrite::Reveal(id) => match state.positions.get_mut(id) {
                Some(position) => position.isRevealed = true,
                None => bail!("execution reverted: unknown position {id}"),
            },
        }

        state.sent += 1;
        state.writes.push(write);
        Ok(tx_hash(state.sent))
    }
}

#[async_trait]
impl TradingRead for MockLedger {
    async fn get_position(&self, position_id: U256) -> Result<Position> {
        self.check_read()?;
        self.position(position_id)
            .ok_or_else(|| eyre!("execution reverted: unknown position {position_id}"))
    }

    async fn positions_of(&self, owner: Address) -> Result<Vec<U256>> {
        self.check_read()?;
        let state = locked(&self.state);
        Ok(state
            .positions
            .iter()
            .filter(|(_, p)| p.owner == owner)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn mark_price(&self) -> Result<U256> {
        self.check_read()?;
        Ok(locked(&self.state).mark_price)
    }

    async fn is_paused(&self) -> Result<bool> {
        self.check_read()?;
        Ok(locked(&self.state).paused)
    }
}

#[async_trait]
impl TradingWrite for MockLedger {
    async fn open_position(
        &self,
        is_long: B256,
        size: B256,
        input_proof: Bytes,
        leverage: U256,
    ) -> Result<TxHash> {
        self.record_write(LedgerWrite::Open {
            is_long,
            size,
            input_proof,
            leverage,
        })
    }

    async fn close_position(&self, position_id: U256) -> Result<TxHash> {
        self.record_write(LedgerWrite::Close(position_id))
    }

    async fn reveal_position(&self, position_id: U256) -> Result<TxHash> {
        self.record_write(LedgerWrite::Reveal(position_id))
    }
}

#[async_trait]
impl ReceiptWaiter for MockLedger {
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<TxReceipt, ReceiptError> {
        let (outcome, delay, block) = {
            let state = locked(&self.state);
            (state.receipt_outcome, state.receipt_delay, state.sent)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match outcome {
            ReceiptOutcome::TimedOut => Err(ReceiptError::Timeout {
                hash,
                waited: delay.unwrap_or_default(),
            }),
            ReceiptOutcome::Mined | ReceiptOutcome::Reverted => Ok(TxReceipt {
                transaction_hash: hash,
                block_number: Some(100 + block),
                gas_used: 120_000,
                success: outcome == ReceiptOutcome::Mined,
            }),
        }
    }
}
