// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod context;
mod decrypt;
mod error;
mod input;
mod orchestrator;
pub mod scale;
mod trading;
mod transaction;

pub use context::{ContextState, EncryptionContext, DEFAULT_VALIDITY_DAYS};
pub use decrypt::{DecryptionResult, DecryptionSession};
pub use error::{is_rejection_message, FailureKind, SdkError, TxFailure};
pub use input::EncryptedInputSession;
pub use orchestrator::{Execution, TransactionOrchestrator};
pub use trading::{PositionView, TradingClient};
pub use transaction::{RunId, TransactionState, TransactionStateMachine, TransactionStatus};

pub use shade_evm_helpers as evm_helpers;
pub use shade_fhe as fhe;
