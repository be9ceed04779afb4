// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::values::{FheType, FheValue};
use alloy::primitives::{Bytes, B256};
use serde::{Deserialize, Serialize};
use std::{fmt, marker::PhantomData, str::FromStr};
use thiserror::Error;

const INDEX_BYTE: usize = 21;
const CHAIN_ID_BYTES: std::ops::Range<usize> = 22..30;
const TYPE_BYTE: usize = 30;
const VERSION_BYTE: usize = 31;

/// Handle layout version produced by the current ledger.
pub const HANDLE_VERSION: u8 = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    #[error("invalid handle: {0}")]
    Parse(String),
    #[error("handle {handle} holds an unknown type id {id}")]
    UnknownType { handle: Handle, id: u8 },
    #[error("handle {handle} holds {actual}, expected {expected}")]
    TypeMismatch {
        handle: Handle,
        expected: FheType,
        actual: FheType,
    },
}

/// Opaque 32 byte reference to a ciphertext stored on the ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(B256);

impl Handle {
    pub fn new(bytes: B256) -> Self {
        Self(bytes)
    }

    /// Build a handle with the ledger's byte layout. Only ledger stand-ins need this.
    pub fn compose(prefix: [u8; 21], index: u8, chain_id: u64, fhe_type: FheType) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..INDEX_BYTE].copy_from_slice(&prefix);
        bytes[INDEX_BYTE] = index;
        bytes[CHAIN_ID_BYTES].copy_from_slice(&chain_id.to_be_bytes());
        bytes[TYPE_BYTE] = fhe_type.id();
        bytes[VERSION_BYTE] = HANDLE_VERSION;
        Self(B256::from(bytes))
    }

    pub fn as_b256(&self) -> B256 {
        self.0
    }

    /// Position of the value inside the input batch that produced it.
    pub fn index(&self) -> u8 {
        self.0[INDEX_BYTE]
    }

    pub fn chain_id(&self) -> u64 {
        let mut be = [0u8; 8];
        be.copy_from_slice(&self.0[CHAIN_ID_BYTES]);
        u64::from_be_bytes(be)
    }

    pub fn type_id(&self) -> u8 {
        self.0[TYPE_BYTE]
    }

    pub fn fhe_type(&self) -> Result<FheType, HandleError> {
        FheType::from_id(self.type_id()).ok_or(HandleError::UnknownType {
            handle: *self,
            id: self.type_id(),
        })
    }

    pub fn version(&self) -> u8 {
        self.0[VERSION_BYTE]
    }
}

impl From<B256> for Handle {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<Handle> for B256 {
    fn from(value: Handle) -> Self {
        value.0
    }
}

impl FromStr for Handle {
    type Err = HandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s.trim())
            .map(Self)
            .map_err(|e| HandleError::Parse(e.to_string()))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

/// A handle together with the kind of value it is expected to decrypt to.
pub struct TypedHandle<T: FheValue> {
    handle: Handle,
    _kind: PhantomData<fn() -> T>,
}

impl<T: FheValue> TypedHandle<T> {
    /// Fails when the handle's type byte disagrees with `T`.
    pub fn new(handle: Handle) -> Result<Self, HandleError> {
        let actual = handle.fhe_type()?;
        if actual != T::FHE_TYPE {
            return Err(HandleError::TypeMismatch {
                handle,
                expected: T::FHE_TYPE,
                actual,
            });
        }
        Ok(Self {
            handle,
            _kind: PhantomData,
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl<T: FheValue> Clone for TypedHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: FheValue> Copy for TypedHandle<T> {}

impl<T: FheValue> PartialEq for TypedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<T: FheValue> Eq for TypedHandle<T> {}

impl<T: FheValue> fmt::Debug for TypedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedHandle<{}>({})", T::FHE_TYPE, self.handle.0)
    }
}

/// Handles produced for one batch of values plus the proof the ledger checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub handles: Vec<Handle>,
    pub proof: Bytes,
}
