// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::receipt::{poll_for_receipt, ReceiptError, ReceiptWaiter, TxReceipt};
use crate::retry::{call_with_retry, TRANSIENT_READ_ERRORS};
use alloy::providers::fillers::BlobGasFiller;
use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, Bytes, TxHash, B256, U256},
    providers::fillers::{
        ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller, WalletFiller,
    },
    providers::{Identity, Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    sol,
};
use async_trait::async_trait;
use eyre::Result;
use once_cell::sync::Lazy;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::info;

static NONCE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub async fn next_pending_nonce<P>(provider: &P, from: Address) -> eyre::Result<u64>
where
    P: Provider<Ethereum> + Send + Sync,
{
    provider
        .get_transaction_count(from)
        .pending()
        .await
        .map_err(Into::into)
}

sol! {
    /// Handles are the encrypted side of a position; only the owner can decrypt them.
    #[derive(Debug)]
    struct Position {
        address owner;
        bytes32 isLong;
        bytes32 size;
        uint256 leverage;
        uint256 entryPrice;
        bool isOpen;
        bool isRevealed;
    }

    #[derive(Debug)]
    #[sol(rpc)]
    contract ConfidentialTrading {
        function openPosition(bytes32 isLong, bytes32 size, bytes calldata inputProof, uint256 leverage) external returns (uint256 positionId);
        function closePosition(uint256 positionId) external;
        function revealPosition(uint256 positionId) external;
        function getPosition(uint256 positionId) external view returns (Position memory position);
        function positionsOf(address owner) external view returns (uint256[] memory ids);
        function markPrice() external view returns (uint256 price);
        function paused() external view returns (bool);
    }
}

/// Read-only views of the trading contract.
#[async_trait]
pub trait TradingRead: Send + Sync {
    /// Position with its encrypted fields as handles
    async fn get_position(&self, position_id: U256) -> Result<Position>;

    async fn positions_of(&self, owner: Address) -> Result<Vec<U256>>;

    /// Public mark price, eight implied decimals
    async fn mark_price(&self) -> Result<U256>;

    async fn is_paused(&self) -> Result<bool>;
}

/// Writes against the trading contract. Each returns once the node has accepted
/// the transaction; mining is tracked separately through [`ReceiptWaiter`].
#[async_trait]
pub trait TradingWrite: Send + Sync {
    /// Handles must be passed in the order they were added to the encrypted input.
    async fn open_position(
        &self,
        is_long: B256,
        size: B256,
        input_proof: Bytes,
        leverage: U256,
    ) -> Result<TxHash>;

    async fn close_position(&self, position_id: U256) -> Result<TxHash>;

    /// Publishes the position in cleartext on chain.
    async fn reveal_position(&self, position_id: U256) -> Result<TxHash>;
}

/// Generic type to represent different provider types
pub trait ProviderType: Send + Sync {
    type Provider: Provider + Send + Sync + 'static;
}

/// Marker type for read-only provider
#[derive(Clone)]
pub struct ReadOnly;
impl ProviderType for ReadOnly {
    type Provider = TradingReadOnlyProvider;
}

/// Marker type for read-write provider
#[derive(Clone)]
pub struct ReadWrite;
impl ProviderType for ReadWrite {
    type Provider = TradingWriteProvider;
}

/// Type alias for read-only provider
pub type TradingReadOnlyProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
>;

/// Type alias for read-write provider
pub type TradingWriteProvider = FillProvider<
    JoinFill<
        JoinFill<
            JoinFill<
                Identity,
                JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
            >,
            WalletFiller<EthereumWallet>,
        >,
        NonceFiller,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

/// Tuning for reads and receipt polling
#[derive(Debug, Clone)]
pub struct ContractOptions {
    pub poll_interval: Duration,
    pub receipt_timeout: Option<Duration>,
    pub read_retry_attempts: u32,
}

impl Default for ContractOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            receipt_timeout: None,
            read_retry_attempts: 3,
        }
    }
}

/// Trading contract bound to a provider
#[derive(Clone)]
pub struct TradingContract<T: ProviderType> {
    pub provider: Arc<T::Provider>,
    pub contract_address: Address,
    sender: Option<Address>,
    options: ContractOptions,
    _marker: PhantomData<T>,
}

impl<T: ProviderType> TradingContract<T> {
    pub fn address(&self) -> &Address {
        &self.contract_address
    }

    pub fn options(&self) -> &ContractOptions {
        &self.options
    }
}

impl TradingContract<ReadWrite> {
    pub async fn new(
        http_rpc_url: &str,
        private_key: &str,
        contract_address: &str,
        options: ContractOptions,
    ) -> Result<TradingContract<ReadWrite>> {
        TradingContractFactory::create_write(http_rpc_url, contract_address, private_key, options)
            .await
    }

    pub fn sender(&self) -> Option<Address> {
        self.sender
    }
}

impl TradingContract<ReadOnly> {
    pub async fn read_only(
        http_rpc_url: &str,
        contract_address: &str,
        options: ContractOptions,
    ) -> Result<TradingContract<ReadOnly>> {
        TradingContractFactory::create_read(http_rpc_url, contract_address, options).await
    }
}

pub type TradingReadContract = TradingContract<ReadOnly>;
pub type TradingWriteContract = TradingContract<ReadWrite>;

pub struct TradingContractFactory;

impl TradingContractFactory {
    /// Create a write-capable contract
    pub async fn create_write(
        http_rpc_url: &str,
        contract_address: &str,
        private_key: &str,
        options: ContractOptions,
    ) -> Result<TradingContract<ReadWrite>> {
        let contract_address = contract_address.parse()?;

        let signer: PrivateKeySigner = private_key.parse()?;
        let sender = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .with_cached_nonce_management()
            .connect(http_rpc_url)
            .await?;

        Ok(TradingContract::<ReadWrite> {
            provider: Arc::new(provider),
            contract_address,
            sender: Some(sender),
            options,
            _marker: PhantomData,
        })
    }

    /// Create a read-only contract
    pub async fn create_read(
        http_rpc_url: &str,
        contract_address: &str,
        options: ContractOptions,
    ) -> Result<TradingContract<ReadOnly>> {
        let contract_address = contract_address.parse()?;

        let provider = ProviderBuilder::new().connect(http_rpc_url).await?;

        Ok(TradingContract::<ReadOnly> {
            provider: Arc::new(provider),
            contract_address,
            sender: None,
            options,
            _marker: PhantomData,
        })
    }
}

#[async_trait]
impl<T> TradingRead for TradingContract<T>
where
    T: ProviderType,
{
    async fn get_position(&self, position_id: U256) -> Result<Position> {
        let contract = ConfidentialTrading::new(self.contract_address, &self.provider);
        call_with_retry(
            "getPosition",
            self.options.read_retry_attempts,
            TRANSIENT_READ_ERRORS,
            || async { Ok(contract.getPosition(position_id).call().await?) },
        )
        .await
    }

    async fn positions_of(&self, owner: Address) -> Result<Vec<U256>> {
        let contract = ConfidentialTrading::new(self.contract_address, &self.provider);
        call_with_retry(
            "positionsOf",
            self.options.read_retry_attempts,
            TRANSIENT_READ_ERRORS,
            || async { Ok(contract.positionsOf(owner).call().await?) },
        )
        .await
    }

    async fn mark_price(&self) -> Result<U256> {
        let contract = ConfidentialTrading::new(self.contract_address, &self.provider);
        call_with_retry(
            "markPrice",
            self.options.read_retry_attempts,
            TRANSIENT_READ_ERRORS,
            || async { Ok(contract.markPrice().call().await?) },
        )
        .await
    }

    async fn is_paused(&self) -> Result<bool> {
        let contract = ConfidentialTrading::new(self.contract_address, &self.provider);
        call_with_retry(
            "paused",
            self.options.read_retry_attempts,
            TRANSIENT_READ_ERRORS,
            || async { Ok(contract.paused().call().await?) },
        )
        .await
    }
}

impl TradingContract<ReadWrite> {
    async fn nonce(&self) -> Result<u64> {
        let from = self
            .sender
            .ok_or_else(|| eyre::eyre!("write contract has no sender"))?;
        next_pending_nonce(&*self.provider, from).await
    }
}

#[async_trait]
impl TradingWrite for TradingContract<ReadWrite> {
    async fn open_position(
        &self,
        is_long: B256,
        size: B256,
        input_proof: Bytes,
        leverage: U256,
    ) -> Result<TxHash> {
        let _guard = NONCE_LOCK.lock().await;
        let nonce = self.nonce().await?;

        let contract = ConfidentialTrading::new(self.contract_address, &self.provider);
        let pending = contract
            .openPosition(is_long, size, input_proof, leverage)
            .nonce(nonce)
            .send()
            .await?;
        let hash = *pending.tx_hash();
        info!("openPosition broadcast: {}", hash);
        Ok(hash)
    }

    async fn close_position(&self, position_id: U256) -> Result<TxHash> {
        let _guard = NONCE_LOCK.lock().await;
        let nonce = self.nonce().await?;

        let contract = ConfidentialTrading::new(self.contract_address, &self.provider);
        let pending = contract
            .closePosition(position_id)
            .nonce(nonce)
            .send()
            .await?;
        let hash = *pending.tx_hash();
        info!("closePosition({}) broadcast: {}", position_id, hash);
        Ok(hash)
    }

    async fn reveal_position(&self, position_id: U256) -> Result<TxHash> {
        let _guard = NONCE_LOCK.lock().await;
        let nonce = self.nonce().await?;

        let contract = ConfidentialTrading::new(self.contract_address, &self.provider);
        let pending = contract
            .revealPosition(position_id)
            .nonce(nonce)
            .send()
            .await?;
        let hash = *pending.tx_hash();
        info!("revealPosition({}) broadcast: {}", position_id, hash);
        Ok(hash)
    }
}

#[async_trait]
impl<T> ReceiptWaiter for TradingContract<T>
where
    T: ProviderType,
{
    async fn wait_for_receipt(&self, hash: TxHash) -> std::result::Result<TxReceipt, ReceiptError> {
        poll_for_receipt(
            hash,
            self.options.poll_interval,
            self.options.receipt_timeout,
            || async {
                let receipt = self.provider.get_transaction_receipt(hash).await?;
                Ok(receipt.as_ref().map(TxReceipt::from))
            },
        )
        .await
    }
}
