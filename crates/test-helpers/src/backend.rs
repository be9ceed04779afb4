// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::utils::locked;
use alloy::{
    dyn_abi::TypedData,
    primitives::{keccak256, Address, Bytes, Signature, U256},
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use shade_fhe::{
    authorization::authorization_typed_data, seal, EncryptedInput, FheBackend, FheType, Handle,
    NetworkContext, PlaintextValue, UserDecryptRequest,
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::debug;

/// What a decryption request looked like when it reached the backend.
#[derive(Debug, Clone)]
pub struct RecordedDecrypt {
    pub public_key: [u8; 32],
    pub handles: Vec<Handle>,
    pub contract_addresses: Vec<Address>,
    pub user_address: Address,
    pub signature: String,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

#[derive(Debug, Default)]
struct BackendState {
    network: Option<NetworkContext>,
    init_calls: usize,
    init_delay: Option<Duration>,
    init_error: Option<String>,
    encrypt_error: Option<String>,
    decrypt_error: Option<String>,
    drop_from_encrypt: bool,
    batches: u64,
    values: HashMap<Handle, U256>,
    withheld: HashSet<Handle>,
    unrequested: Vec<(Handle, U256)>,
    decrypts: Vec<RecordedDecrypt>,
}

/// Backend that keeps plaintexts in memory instead of encrypting them.
///
/// Handles follow the ledger layout so type and index checks still apply.
/// `user_decrypt` checks that the signature recovers to the requesting user
/// and seals each value to the request's public key before opening it.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_init_delay(self, delay: Duration) -> Self {
        locked(&self.state).init_delay = Some(delay);
        self
    }

    pub fn fail_initialize(&self, reason: Option<&str>) {
        locked(&self.state).init_error = reason.map(str::to_string);
    }

    pub fn fail_encrypt(&self, reason: Option<&str>) {
        locked(&self.state).encrypt_error = reason.map(str::to_string);
    }

    pub fn fail_decrypt(&self, reason: Option<&str>) {
        locked(&self.state).decrypt_error = reason.map(str::to_string);
    }

    /// Return one handle fewer than requested from the next encryptions.
    pub fn drop_last_handle(&self, drop: bool) {
        locked(&self.state).drop_from_encrypt = drop;
    }

    /// Leave `handle` out of decryption responses.
    pub fn withhold(&self, handle: Handle) {
        locked(&self.state).withheld.insert(handle);
    }

    /// Append a value nobody asked for to decryption responses.
    pub fn add_unrequested(&self, handle: Handle, value: U256) {
        locked(&self.state).unrequested.push((handle, value));
    }

    /// Plant a ciphertext as if another party had encrypted it.
    pub fn store(&self, handle: Handle, value: U256) {
        locked(&self.state).values.insert(handle, value);
    }

    pub fn init_calls(&self) -> usize {
        locked(&self.state).init_calls
    }

    pub fn decrypts(&self) -> Vec<RecordedDecrypt> {
        locked(&self.state).decrypts.clone()
    }

    pub fn stored(&self, handle: &Handle) -> Option<U256> {
        locked(&self.state).values.get(handle).copied()
    }

    fn network(&self) -> Result<NetworkContext> {
        locked(&self.state)
            .network
            .clone()
            .ok_or_else(|| anyhow!("backend used before initialize"))
    }
}

#[async_trait]
impl FheBackend for MockBackend {
    async fn initialize(&self, network: &NetworkContext) -> Result<()> {
        let delay = {
            let mut state = locked(&self.state);
            state.init_calls += 1;
            state.init_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = locked(&self.state);
        if let Some(reason) = &state.init_error {
            bail!("{reason}");
        }
        state.network = Some(network.clone());
        Ok(())
    }

    async fn encrypt(
        &self,
        contract: Address,
        user: Address,
        values: &[PlaintextValue],
    ) -> Result<EncryptedInput> {
        let chain_id = self.network()?.chain_id;
        let mut state = locked(&self.state);
        if let Some(reason) = &state.encrypt_error {
            bail!("{reason}");
        }

        state.batches += 1;
        let mut seed = Vec::with_capacity(48);
        seed.extend_from_slice(contract.as_slice());
        seed.extend_from_slice(user.as_slice());
        seed.extend_from_slice(&state.batches.to_be_bytes());
        let digest = keccak256(&seed);
        let mut prefix = [0u8; 21];
        prefix.copy_from_slice(&digest[..21]);

        let mut handles = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            let index = u8::try_from(i).map_err(|_| anyhow!("batch too large"))?;
            let handle = Handle::compose(prefix, index, chain_id, value.fhe_type());
            state.values.insert(handle, value.as_u256());
            handles.push(handle);
        }
        if state.drop_from_encrypt {
            handles.pop();
        }
        debug!("mock encrypted {} values for {}", values.len(), contract);

        let proof = keccak256(
            handles
                .iter()
                .flat_map(|h| h.as_b256().0)
                .collect::<Vec<u8>>(),
        );
        Ok(EncryptedInput {
            handles,
            proof: Bytes::copy_from_slice(proof.as_slice()),
        })
    }

    fn create_authorization(
        &self,
        public_key: &[u8],
        contract_addresses: &[Address],
        start_timestamp: u64,
        duration_days: u64,
    ) -> Result<TypedData> {
        let network = self.network()?;
        Ok(authorization_typed_data(
            network.chain_id,
            network.verifying_contract,
            public_key,
            contract_addresses,
            start_timestamp,
            duration_days,
        ))
    }

    async fn user_decrypt(&self, request: UserDecryptRequest) -> Result<HashMap<Handle, U256>> {
        let public_key = request.keypair.public_key();
        let typed = self.create_authorization(
            &public_key,
            &request.contract_addresses,
            request.start_timestamp,
            request.duration_days,
        )?;
        let signature = Signature::try_from(hex::decode(&request.signature)?.as_slice())?;
        let signer = signature.recover_address_from_prehash(&typed.eip712_signing_hash()?)?;
        if signer != request.user_address {
            bail!("authorization signed by {signer}, expected {}", request.user_address);
        }

        let mut state = locked(&self.state);
        state.decrypts.push(RecordedDecrypt {
            public_key,
            handles: request.pairs.iter().map(|p| p.handle).collect(),
            contract_addresses: request.contract_addresses.clone(),
            user_address: request.user_address,
            signature: request.signature.clone(),
            start_timestamp: request.start_timestamp,
            duration_days: request.duration_days,
        });
        if let Some(reason) = &state.decrypt_error {
            bail!("{reason}");
        }

        let mut out = HashMap::new();
        for pair in &request.pairs {
            if state.withheld.contains(&pair.handle) {
                continue;
            }
            let value = state
                .values
                .get(&pair.handle)
                .copied()
                .ok_or_else(|| anyhow!("unknown handle {}", pair.handle))?;
            let sealed = seal(&public_key, pair.handle, value)?;
            out.insert(pair.handle, request.keypair.open(&sealed)?);
        }
        for (handle, value) in &state.unrequested {
            out.insert(*handle, *value);
        }
        Ok(out)
    }
}

/// Handle with the ledger layout, for values planted through [`MockBackend::store`].
pub fn planted_handle(seed: u8, index: u8, chain_id: u64, fhe_type: FheType) -> Handle {
    Handle::compose([seed; 21], index, chain_id, fhe_type)
}
