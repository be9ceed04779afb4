// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

pub mod contracts;
pub mod receipt;
pub mod retry;
pub mod wallet;

pub use receipt::{ReceiptError, ReceiptWaiter, TxReceipt};
pub use wallet::{AddChainParams, LocalWallet, Wallet, WalletError};
