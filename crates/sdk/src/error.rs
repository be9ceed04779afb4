// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::context::ContextState;
use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use shade_evm_helpers::{wallet::USER_REJECTED_CODE, ReceiptError, WalletError};
use std::fmt;
use thiserror::Error;

/// Phrases wallets use when the user declines a request.
const REJECTION_PHRASES: &[&str] = &["user rejected", "user denied", "rejected by user"];

/// True when an untyped error message reads like a declined wallet prompt.
///
/// The EIP-1193 code only counts as a standalone token, so hashes and amounts
/// that happen to contain its digits do not match.
pub fn is_rejection_message(message: &str) -> bool {
    let message = message.to_lowercase();
    let code = USER_REJECTED_CODE.to_string();
    REJECTION_PHRASES.iter().any(|s| message.contains(s))
        || message
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| token == code)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("encryption context is not ready ({0})")]
    ContextNotReady(ContextState),
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    #[error("encryption failed: {0}")]
    EncryptionFailure(String),
    #[error("decryption authorization was rejected by the user")]
    AuthorizationRejected,
    #[error("decryption failed: {0}")]
    DecryptionFailure(String),
    #[error("transaction was rejected by the user")]
    ChainWriteRejected,
    #[error("transaction failed: {reason}")]
    ChainWriteFailed { reason: String },
    #[error("no receipt for {hash} in time")]
    ReceiptTimeout { hash: TxHash },
    #[error("chain read failed: {0}")]
    ChainRead(String),
}

impl SdkError {
    /// Classify a failed ledger write.
    pub fn chain_write(err: &eyre::Report) -> Self {
        let declined = err
            .chain()
            .any(|cause| matches!(cause.downcast_ref::<WalletError>(), Some(WalletError::Rejected)));
        if declined || is_rejection_message(&format!("{err:#}")) {
            return SdkError::ChainWriteRejected;
        }
        SdkError::ChainWriteFailed {
            reason: format!("{err:#}"),
        }
    }

    /// Classify a failed signing request during decryption.
    pub fn authorization(err: &WalletError) -> Self {
        match err {
            WalletError::Rejected => SdkError::AuthorizationRejected,
            WalletError::Other(msg) if is_rejection_message(msg) => SdkError::AuthorizationRejected,
            other => SdkError::DecryptionFailure(format!("signing failed: {other}")),
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SdkError::ContextNotReady(_) => FailureKind::ContextNotReady,
            SdkError::InitializationFailed(_) | SdkError::ChainRead(_) => FailureKind::Other,
            SdkError::EncryptionFailure(_) => FailureKind::EncryptionFailure,
            SdkError::AuthorizationRejected => FailureKind::AuthorizationRejected,
            SdkError::DecryptionFailure(_) => FailureKind::DecryptionFailure,
            SdkError::ChainWriteRejected => FailureKind::ChainWriteRejected,
            SdkError::ChainWriteFailed { .. } => FailureKind::ChainWriteFailed,
            SdkError::ReceiptTimeout { .. } => FailureKind::ReceiptTimeout,
        }
    }

    /// The user declined; callers treat this as cancellation, not a fault.
    pub fn is_user_rejection(&self) -> bool {
        self.failure_kind().is_user_rejection()
    }
}

impl From<ReceiptError> for SdkError {
    fn from(value: ReceiptError) -> Self {
        match value {
            ReceiptError::Timeout { hash, .. } => SdkError::ReceiptTimeout { hash },
            ReceiptError::Rpc { reason, .. } => SdkError::ChainWriteFailed { reason },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    AuthorizationRejected,
    ChainWriteRejected,
    ChainWriteFailed,
    ReceiptTimeout,
    EncryptionFailure,
    DecryptionFailure,
    ContextNotReady,
    Other,
}

impl FailureKind {
    pub fn is_user_rejection(self) -> bool {
        matches!(
            self,
            FailureKind::AuthorizationRejected | FailureKind::ChainWriteRejected
        )
    }
}

/// Normalized failure stored on a transaction state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TxFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.kind.is_user_rejection()
    }
}

impl From<&SdkError> for TxFailure {
    fn from(err: &SdkError) -> Self {
        let kind = err.failure_kind();
        let message = match kind {
            FailureKind::ChainWriteRejected => "Transaction rejected by user".to_string(),
            FailureKind::AuthorizationRejected => "Decryption request rejected by user".to_string(),
            _ => err.to_string(),
        };
        Self { kind, message }
    }
}

impl fmt::Display for TxFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
