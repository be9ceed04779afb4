// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::utils::locked;
use alloy::{dyn_abi::TypedData, primitives::Address, signers::local::PrivateKeySigner};
use async_trait::async_trait;
use shade_evm_helpers::{AddChainParams, LocalWallet, Wallet, WalletError};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

#[derive(Debug, Default)]
struct WalletState {
    current_chain: u64,
    known_chains: HashSet<u64>,
    reject_signatures: bool,
    switch_calls: Vec<u64>,
    added_chains: Vec<AddChainParams>,
    signed: Vec<TypedData>,
}

/// A wallet that signs with a real key but lets tests decline prompts and
/// inspect network negotiation.
#[derive(Clone)]
pub struct MockWallet {
    signer: LocalWallet,
    state: Arc<Mutex<WalletState>>,
}

impl MockWallet {
    /// Starts on `chain_id`, which is also the only chain it knows.
    pub fn new(chain_id: u64) -> Self {
        Self {
            signer: LocalWallet::new(PrivateKeySigner::random(), chain_id),
            state: Arc::new(Mutex::new(WalletState {
                current_chain: chain_id,
                known_chains: HashSet::from([chain_id]),
                ..Default::default()
            })),
        }
    }

    pub fn knowing(self, chain_id: u64) -> Self {
        locked(&self.state).known_chains.insert(chain_id);
        self
    }

    pub fn reject_signatures(&self, reject: bool) {
        locked(&self.state).reject_signatures = reject;
    }

    pub fn current_chain(&self) -> u64 {
        locked(&self.state).current_chain
    }

    pub fn switch_calls(&self) -> Vec<u64> {
        locked(&self.state).switch_calls.clone()
    }

    pub fn added_chains(&self) -> Vec<AddChainParams> {
        locked(&self.state).added_chains.clone()
    }

    pub fn signed(&self) -> Vec<TypedData> {
        locked(&self.state).signed.clone()
    }
}

#[async_trait]
impl Wallet for MockWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.current_chain())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let mut state = locked(&self.state);
        state.switch_calls.push(chain_id);
        if !state.known_chains.contains(&chain_id) {
            return Err(WalletError::UnrecognizedChain(chain_id));
        }
        state.current_chain = chain_id;
        Ok(())
    }

    async fn add_chain(&self, params: &AddChainParams) -> Result<(), WalletError> {
        let mut state = locked(&self.state);
        state.known_chains.insert(params.chain_id);
        state.added_chains.push(params.clone());
        Ok(())
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<String, WalletError> {
        {
            let mut state = locked(&self.state);
            if state.reject_signatures {
                return Err(WalletError::Rejected);
            }
            state.signed.push(typed_data.clone());
        }
        self.signer.sign_typed_data(typed_data).await
    }
}
