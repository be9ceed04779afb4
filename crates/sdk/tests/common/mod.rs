// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

#![allow(dead_code)]

use shade_evm_helpers::Wallet;
use shade_sdk::{EncryptionContext, TradingClient};
use shade_test_helpers::{test_network, trading_contract, MockBackend, MockLedger, MockWallet, TEST_CHAIN_ID};
use std::sync::Arc;

pub struct Harness {
    pub backend: MockBackend,
    pub wallet: MockWallet,
    pub ledger: MockLedger,
    pub context: EncryptionContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(MockBackend::new(), MockWallet::new(TEST_CHAIN_ID))
    }

    pub fn with(backend: MockBackend, wallet: MockWallet) -> Self {
        let ledger = MockLedger::new(wallet.address());
        let context = EncryptionContext::new(
            Arc::new(backend.clone()),
            Arc::new(wallet.clone()),
            test_network(),
        );
        Self {
            backend,
            wallet,
            ledger,
            context,
        }
    }

    pub async fn ready() -> Self {
        let harness = Self::new();
        harness
            .context
            .initialize()
            .await
            .expect("mock context initializes");
        harness
    }

    pub fn trading_client(&self) -> TradingClient {
        let ledger = Arc::new(self.ledger.clone());
        TradingClient::new(
            self.context.clone(),
            trading_contract(),
            ledger.clone(),
            ledger.clone(),
            ledger,
        )
    }
}
