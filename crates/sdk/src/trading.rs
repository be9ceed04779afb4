// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    context::EncryptionContext,
    error::SdkError,
    orchestrator::{Execution, TransactionOrchestrator},
};
use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use shade_evm_helpers::{
    contracts::{TradingRead, TradingWrite},
    ReceiptWaiter,
};
use shade_fhe::{Handle, HandleContractPair, TypedHandle};
use std::sync::Arc;
use tracing::{info, instrument};

/// A position as seen by its owner after decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    pub id: U256,
    pub owner: Address,
    pub is_long: bool,
    pub size: u64,
    pub leverage: U256,
    pub entry_price: U256,
    pub is_open: bool,
    pub is_revealed: bool,
}

/// One trading contract, one encryption context, and an independent
/// orchestrator per action.
pub struct TradingClient {
    context: EncryptionContext,
    contract: Address,
    reader: Arc<dyn TradingRead>,
    writer: Arc<dyn TradingWrite>,
    open: TransactionOrchestrator,
    close: TransactionOrchestrator,
    reveal: TransactionOrchestrator,
}

impl TradingClient {
    pub fn new(
        context: EncryptionContext,
        contract: Address,
        reader: Arc<dyn TradingRead>,
        writer: Arc<dyn TradingWrite>,
        receipts: Arc<dyn ReceiptWaiter>,
    ) -> Self {
        Self {
            context,
            contract,
            reader,
            writer,
            open: TransactionOrchestrator::new("open", receipts.clone()),
            close: TransactionOrchestrator::new("close", receipts.clone()),
            reveal: TransactionOrchestrator::new("reveal", receipts),
        }
    }

    pub fn context(&self) -> &EncryptionContext {
        &self.context
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn open_orchestrator(&self) -> &TransactionOrchestrator {
        &self.open
    }

    pub fn close_orchestrator(&self) -> &TransactionOrchestrator {
        &self.close
    }

    pub fn reveal_orchestrator(&self) -> &TransactionOrchestrator {
        &self.reveal
    }

    /// Encrypt direction and size together and submit them with `leverage`.
    pub async fn open_position(&self, is_long: bool, size: u64, leverage: u64) -> Execution {
        self.open
            .execute(|| self.submit_open(is_long, size, leverage))
            .await
    }

    async fn submit_open(&self, is_long: bool, size: u64, leverage: u64) -> Result<TxHash, SdkError> {
        let user = self.context.wallet().address();
        let mut session = self
            .context
            .create_encrypted_input_session(self.contract, user)?;
        session.add_bool(is_long).add_u64(size);
        let input = session.encrypt().await?;

        let (is_long_handle, size_handle) = match input.handles.as_slice() {
            [a, b] => (*a, *b),
            other => {
                return Err(SdkError::EncryptionFailure(format!(
                    "expected 2 handles, got {}",
                    other.len()
                )))
            }
        };
        self.writer
            .open_position(
                is_long_handle.as_b256(),
                size_handle.as_b256(),
                input.proof,
                U256::from(leverage),
            )
            .await
            .map_err(|e| SdkError::chain_write(&e))
    }

    pub async fn close_position(&self, position_id: U256) -> Execution {
        self.close
            .execute(|| async {
                self.writer
                    .close_position(position_id)
                    .await
                    .map_err(|e| SdkError::chain_write(&e))
            })
            .await
    }

    /// Makes the position public on chain. Unrelated to [`Self::decrypt_position`].
    pub async fn reveal_position(&self, position_id: U256) -> Execution {
        self.reveal
            .execute(|| async {
                self.writer
                    .reveal_position(position_id)
                    .await
                    .map_err(|e| SdkError::chain_write(&e))
            })
            .await
    }

    /// Decrypt direction and size for the owner, behind one signature.
    #[instrument(skip(self))]
    pub async fn decrypt_position(&self, position_id: U256) -> Result<PositionView, SdkError> {
        let session = self.context.create_decryption_session()?;
        let position = self.reader.get_position(position_id).await.map_err(chain_read)?;

        let is_long = TypedHandle::<bool>::new(Handle::from(position.isLong))
            .map_err(|e| SdkError::DecryptionFailure(e.to_string()))?;
        let size = TypedHandle::<u64>::new(Handle::from(position.size))
            .map_err(|e| SdkError::DecryptionFailure(e.to_string()))?;

        let result = session
            .decrypt(&[
                HandleContractPair::new(is_long.handle(), self.contract),
                HandleContractPair::new(size.handle(), self.contract),
            ])
            .await?;
        let missing = |h: Handle| SdkError::DecryptionFailure(format!("{h} did not decode"));
        let view = PositionView {
            id: position_id,
            owner: position.owner,
            is_long: result.get(&is_long).ok_or_else(|| missing(is_long.handle()))?,
            size: result.get(&size).ok_or_else(|| missing(size.handle()))?,
            leverage: position.leverage,
            entry_price: position.entryPrice,
            is_open: position.isOpen,
            is_revealed: position.isRevealed,
        };
        info!("decrypted position {}", position_id);
        Ok(view)
    }

    pub async fn mark_price(&self) -> Result<U256, SdkError> {
        self.reader.mark_price().await.map_err(chain_read)
    }

    pub async fn is_paused(&self) -> Result<bool, SdkError> {
        self.reader.is_paused().await.map_err(chain_read)
    }

    pub async fn positions_of(&self, owner: Address) -> Result<Vec<U256>, SdkError> {
        self.reader.positions_of(owner).await.map_err(chain_read)
    }
}

fn chain_read(err: eyre::Report) -> SdkError {
    SdkError::ChainRead(format!("{err:#}"))
}
