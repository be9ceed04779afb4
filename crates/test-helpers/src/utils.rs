// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::{Address, B256};
use shade_fhe::NetworkContext;
use std::sync::{Mutex, MutexGuard};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt, EnvFilter};

pub const TEST_CHAIN_ID: u64 = 31337;

/// Route `info` and above into the test output for the lifetime of the guard.
pub fn add_tracing() -> DefaultGuard {
    tracing::subscriber::set_default(
        fmt()
            .with_env_filter(EnvFilter::new("info"))
            .with_test_writer()
            .finish(),
    )
}

pub fn test_network() -> NetworkContext {
    NetworkContext {
        chain_id: TEST_CHAIN_ID,
        chain_name: "anvil".to_string(),
        rpc_url: "http://localhost:8545".to_string(),
        verifying_contract: Address::repeat_byte(0xd0),
    }
}

pub fn trading_contract() -> Address {
    Address::repeat_byte(0x7a)
}

pub fn tx_hash(n: u64) -> B256 {
    B256::left_padding_from(&n.to_be_bytes())
}

// Doubles are only used from tests, a poisoned lock means a test already panicked.
pub(crate) fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
