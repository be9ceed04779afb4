// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{decrypt::DecryptionSession, error::SdkError, input::EncryptedInputSession};
use alloy::primitives::Address;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use shade_evm_helpers::{
    wallet::NativeCurrencyParams, AddChainParams, Wallet, WalletError,
};
use shade_fhe::{FheBackend, NetworkContext};
use std::{
    fmt,
    sync::{Arc, Mutex},
};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Default validity window of a decryption authorization.
pub const DEFAULT_VALIDITY_DAYS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContextState::Uninitialized => "uninitialized",
            ContextState::Initializing => "initializing",
            ContextState::Ready => "ready",
            ContextState::Failed => "failed",
        };
        f.write_str(s)
    }
}

type InitFuture = Shared<BoxFuture<'static, Result<(), SdkError>>>;

struct Inner {
    backend: Arc<dyn FheBackend>,
    wallet: Arc<dyn Wallet>,
    network: NetworkContext,
    add_chain: AddChainParams,
    validity_days: u64,
    state: watch::Sender<ContextState>,
    in_flight: Mutex<Option<InitFuture>>,
}

/// Owns the one-time setup of the encryption backend and the wallet's network binding.
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Clone)]
pub struct EncryptionContext {
    inner: Arc<Inner>,
}

impl EncryptionContext {
    pub fn new(
        backend: Arc<dyn FheBackend>,
        wallet: Arc<dyn Wallet>,
        network: NetworkContext,
    ) -> Self {
        let add_chain = AddChainParams {
            chain_id: network.chain_id,
            chain_name: network.chain_name.clone(),
            native_currency: NativeCurrencyParams {
                name: "Ether".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            rpc_urls: vec![network.rpc_url.clone()],
            block_explorer_urls: vec![],
        };
        let (state, _) = watch::channel(ContextState::Uninitialized);
        Self {
            inner: Arc::new(Inner {
                backend,
                wallet,
                network,
                add_chain,
                validity_days: DEFAULT_VALIDITY_DAYS,
                state,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Parameters sent when the wallet does not know the target chain yet.
    pub fn with_add_chain_params(self, add_chain: AddChainParams) -> Self {
        self.map_inner(|inner| inner.add_chain = add_chain)
    }

    pub fn with_validity_days(self, validity_days: u64) -> Self {
        self.map_inner(|inner| inner.validity_days = validity_days.max(1))
    }

    // Only valid while the context has not been shared yet.
    fn map_inner(self, f: impl FnOnce(&mut Inner)) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                f(&mut inner);
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(inner) => {
                warn!("context already shared; builder option ignored");
                Self { inner }
            }
        }
    }

    /// Bind the wallet to the target network and load the crypto material.
    ///
    /// No-op once Ready or Failed. Concurrent callers share one run and all see
    /// its outcome.
    pub async fn initialize(&self) -> Result<(), SdkError> {
        let run = {
            let mut in_flight = self
                .inner
                .in_flight
                .lock()
                .map_err(|_| SdkError::InitializationFailed("context lock poisoned".into()))?;
            match self.state() {
                ContextState::Ready | ContextState::Failed => return Ok(()),
                ContextState::Uninitialized | ContextState::Initializing => {}
            }
            match in_flight.as_ref() {
                Some(run) => run.clone(),
                None => {
                    let inner = self.inner.clone();
                    let run = async move { inner.run_initialization().await }
                        .boxed()
                        .shared();
                    *in_flight = Some(run.clone());
                    run
                }
            }
        };
        run.await
    }

    pub fn state(&self) -> ContextState {
        *self.inner.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ContextState::Ready
    }

    pub fn has_failed(&self) -> bool {
        self.state() == ContextState::Failed
    }

    /// Receives the state on every transition.
    pub fn subscribe(&self) -> watch::Receiver<ContextState> {
        self.inner.state.subscribe()
    }

    /// Resolves once Ready; errors if the context fails instead.
    pub async fn wait_until_ready(&self) -> Result<(), SdkError> {
        let mut rx = self.subscribe();
        let state = rx
            .wait_for(|s| matches!(s, ContextState::Ready | ContextState::Failed))
            .await
            .map_err(|_| SdkError::InitializationFailed("context dropped".into()))?;
        match *state {
            ContextState::Ready => Ok(()),
            other => Err(SdkError::ContextNotReady(other)),
        }
    }

    /// Failed -> Uninitialized so `initialize` can run again. Returns whether a reset happened.
    pub fn reset_failure(&self) -> bool {
        let Ok(mut in_flight) = self.inner.in_flight.lock() else {
            return false;
        };
        let reset = self.inner.state.send_if_modified(|state| {
            if *state == ContextState::Failed {
                *state = ContextState::Uninitialized;
                true
            } else {
                false
            }
        });
        if reset {
            *in_flight = None;
            info!("encryption context reset after failure");
        }
        reset
    }

    pub fn network(&self) -> &NetworkContext {
        &self.inner.network
    }

    pub fn validity_days(&self) -> u64 {
        self.inner.validity_days
    }

    pub(crate) fn backend(&self) -> &Arc<dyn FheBackend> {
        &self.inner.backend
    }

    pub(crate) fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.inner.wallet
    }

    pub(crate) fn ensure_ready(&self) -> Result<(), SdkError> {
        match self.state() {
            ContextState::Ready => Ok(()),
            other => Err(SdkError::ContextNotReady(other)),
        }
    }

    pub fn create_encrypted_input_session(
        &self,
        contract: Address,
        user: Address,
    ) -> Result<EncryptedInputSession, SdkError> {
        self.ensure_ready()?;
        Ok(EncryptedInputSession::new(self.clone(), contract, user))
    }

    pub fn create_decryption_session(&self) -> Result<DecryptionSession, SdkError> {
        self.ensure_ready()?;
        Ok(DecryptionSession::new(self.clone()))
    }
}

impl Inner {
    fn set_state(&self, next: ContextState) {
        self.state.send_replace(next);
        info!("encryption context {}", next);
    }

    async fn run_initialization(self: Arc<Self>) -> Result<(), SdkError> {
        self.set_state(ContextState::Initializing);
        let result = self.negotiate_network().await;
        let result = match result {
            Ok(()) => self
                .backend
                .initialize(&self.network)
                .await
                .map_err(|e| SdkError::InitializationFailed(format!("{e:#}"))),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => self.set_state(ContextState::Ready),
            Err(e) => {
                error!("encryption context initialization failed: {e}");
                self.set_state(ContextState::Failed);
            }
        }
        result
    }

    async fn negotiate_network(&self) -> Result<(), SdkError> {
        let target = self.network.chain_id;
        let current = self.wallet.chain_id().await.map_err(init_error)?;
        if current == target {
            return Ok(());
        }

        info!("switching wallet from chain {} to {}", current, target);
        match self.wallet.switch_chain(target).await {
            Ok(()) => Ok(()),
            Err(WalletError::UnrecognizedChain(_)) => {
                info!("wallet does not know chain {}; adding it", target);
                self.wallet
                    .add_chain(&self.add_chain)
                    .await
                    .map_err(init_error)?;
                self.wallet.switch_chain(target).await.map_err(init_error)
            }
            Err(e) => Err(init_error(e)),
        }
    }
}

fn init_error(err: WalletError) -> SdkError {
    SdkError::InitializationFailed(format!("network negotiation failed: {err}"))
}
