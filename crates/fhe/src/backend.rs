// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{handle::EncryptedInput, keys::KeyPair, values::PlaintextValue, Handle};
use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, U256},
};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The network the context is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    /// Contract the decryption authorization is verified against
    pub verifying_contract: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleContractPair {
    pub handle: Handle,
    pub contract_address: Address,
}

impl HandleContractPair {
    pub fn new(handle: Handle, contract_address: Address) -> Self {
        Self {
            handle,
            contract_address,
        }
    }
}

/// Everything the backend needs to run one user decryption.
#[derive(Debug)]
pub struct UserDecryptRequest {
    pub pairs: Vec<HandleContractPair>,
    /// Responses are sealed to this keypair; it is dropped with the request.
    pub keypair: KeyPair,
    /// Hex without the `0x` prefix
    pub signature: String,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

/// Client side of the encryption service.
#[async_trait]
pub trait FheBackend: Send + Sync {
    /// Load the crypto material for `network`. Called once per context.
    async fn initialize(&self, network: &NetworkContext) -> Result<()>;

    /// Encrypt a batch of values for `contract`, on behalf of `user`.
    async fn encrypt(
        &self,
        contract: Address,
        user: Address,
        values: &[PlaintextValue],
    ) -> Result<EncryptedInput>;

    fn create_authorization(
        &self,
        public_key: &[u8],
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Result<TypedData>;

    async fn user_decrypt(&self, request: UserDecryptRequest) -> Result<HashMap<Handle, U256>>;
}
