// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::{
    dyn_abi::TypedData,
    primitives::Address,
    signers::{local::PrivateKeySigner, Signer},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tracing::info;

/// EIP-1193 code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 code for a chain the wallet does not know about.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("user rejected the request")]
    Rejected,
    #[error("chain {0} has not been added to the wallet")]
    UnrecognizedChain(u64),
    #[error("wallet error: {0}")]
    Other(String),
}

impl WalletError {
    pub fn code(&self) -> Option<i64> {
        match self {
            WalletError::Rejected => Some(USER_REJECTED_CODE),
            WalletError::UnrecognizedChain(_) => Some(UNRECOGNIZED_CHAIN_CODE),
            WalletError::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrencyParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Parameters of an add-chain request (EIP-3085 shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrencyParams,
    pub rpc_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_explorer_urls: Vec<String>,
}

/// The user's wallet: network binding and the one approval prompt we need.
#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> Address;

    async fn chain_id(&self) -> Result<u64, WalletError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), WalletError>;

    /// Sign EIP-712 typed data, returning a `0x` prefixed 65 byte signature.
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<String, WalletError>;
}

/// A wallet backed by a local private key.
///
/// It starts out on `chain_id` and only knows that chain until others are added.
#[derive(Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
    current_chain: Arc<Mutex<u64>>,
    known_chains: Arc<Mutex<HashSet<u64>>>,
}

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self {
            signer,
            current_chain: Arc::new(Mutex::new(chain_id)),
            known_chains: Arc::new(Mutex::new(HashSet::from([chain_id]))),
        }
    }

    pub fn from_private_key(private_key: &str, chain_id: u64) -> eyre::Result<Self> {
        let signer: PrivateKeySigner = private_key.parse()?;
        Ok(Self::new(signer, chain_id))
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    fn lock_err<T>(_: T) -> WalletError {
        WalletError::Other("wallet state lock poisoned".to_string())
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(*self.current_chain.lock().map_err(Self::lock_err)?)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if !self
            .known_chains
            .lock()
            .map_err(Self::lock_err)?
            .contains(&chain_id)
        {
            return Err(WalletError::UnrecognizedChain(chain_id));
        }
        *self.current_chain.lock().map_err(Self::lock_err)? = chain_id;
        info!("wallet switched to chain {}", chain_id);
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), WalletError> {
        self.known_chains
            .lock()
            .map_err(Self::lock_err)?
            .insert(params.chain_id);
        info!("wallet added chain {} ({})", params.chain_name, params.chain_id);
        Ok(())
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<String, WalletError> {
        let hash = typed_data
            .eip712_signing_hash()
            .map_err(|e| WalletError::Other(format!("invalid typed data: {e}")))?;
        let signature = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(|e| WalletError::Other(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Signature;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn typed_data() -> TypedData {
        serde_json::from_value(serde_json::json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" }
                ],
                "Order": [
                    { "name": "market", "type": "string" },
                    { "name": "nonce", "type": "uint256" }
                ]
            },
            "primaryType": "Order",
            "domain": { "name": "Test", "version": "1", "chainId": "31337" },
            "message": { "market": "ETH-USD", "nonce": 1 }
        }))
        .unwrap()
    }

    fn add_chain_params(chain_id: u64) -> AddChainParams {
        AddChainParams {
            chain_id,
            chain_name: "sepolia".to_string(),
            native_currency: NativeCurrencyParams {
                name: "Ether".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            rpc_urls: vec!["https://rpc.sepolia.example.org".to_string()],
            block_explorer_urls: vec![],
        }
    }

    #[tokio::test]
    async fn test_switch_requires_known_chain() -> eyre::Result<()> {
        let wallet = LocalWallet::from_private_key(KEY, 31337)?;
        assert_eq!(wallet.chain_id().await?, 31337);

        let err = wallet.switch_chain(11155111).await.unwrap_err();
        assert_eq!(err, WalletError::UnrecognizedChain(11155111));
        assert_eq!(err.code(), Some(UNRECOGNIZED_CHAIN_CODE));

        wallet.add_chain(&add_chain_params(11155111)).await?;
        wallet.switch_chain(11155111).await?;
        assert_eq!(wallet.chain_id().await?, 11155111);
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_typed_data_recovers_to_wallet() -> eyre::Result<()> {
        let wallet = LocalWallet::from_private_key(KEY, 31337)?;
        let typed = typed_data();

        let signature = wallet.sign_typed_data(&typed).await?;
        assert!(signature.starts_with("0x"));
        assert_eq!(signature.len(), 2 + 65 * 2);

        let bytes = hex::decode(&signature[2..])?;
        let parsed = Signature::try_from(bytes.as_slice())?;
        let recovered = parsed.recover_address_from_prehash(&typed.eip712_signing_hash()?)?;
        assert_eq!(recovered, wallet.address());
        Ok(())
    }

    #[test]
    fn test_add_chain_params_shape() -> eyre::Result<()> {
        let json = serde_json::to_value(add_chain_params(11155111))?;
        assert_eq!(json["chainId"], 11155111);
        assert_eq!(json["nativeCurrency"]["symbol"], "ETH");
        assert!(json.get("blockExplorerUrls").is_none());
        Ok(())
    }
}
