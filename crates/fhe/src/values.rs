// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::{Address, B256, U256};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of one plaintext limb.
pub const LIMB_BITS: usize = 16;
const LIMB_MASK: u64 = 0xffff;

/// Encrypted value kinds understood by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FheType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Address,
}

impl FheType {
    /// Type id as stored in byte 30 of a handle.
    pub fn id(self) -> u8 {
        match self {
            FheType::Bool => 0,
            FheType::Uint8 => 2,
            FheType::Uint16 => 3,
            FheType::Uint32 => 4,
            FheType::Uint64 => 5,
            FheType::Address => 7,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(FheType::Bool),
            2 => Some(FheType::Uint8),
            3 => Some(FheType::Uint16),
            4 => Some(FheType::Uint32),
            5 => Some(FheType::Uint64),
            7 => Some(FheType::Address),
            _ => None,
        }
    }

    pub fn bits(self) -> usize {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
            FheType::Uint64 => 64,
            FheType::Address => 160,
        }
    }

    /// Number of 16-bit limbs the value occupies in a packed plaintext.
    pub fn limbs(self) -> usize {
        self.bits().div_ceil(LIMB_BITS)
    }
}

impl fmt::Display for FheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FheType::Bool => "ebool",
            FheType::Uint8 => "euint8",
            FheType::Uint16 => "euint16",
            FheType::Uint32 => "euint32",
            FheType::Uint64 => "euint64",
            FheType::Address => "eaddress",
        };
        f.write_str(name)
    }
}

/// A value queued for encryption.
#[derive(Clone, PartialEq, Eq)]
pub enum PlaintextValue {
    Bool(bool),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Address(Address),
}

// Plaintexts end up in logs through session debugging; only the kind is printed.
impl fmt::Debug for PlaintextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaintextValue({})", self.fhe_type())
    }
}

impl PlaintextValue {
    pub fn fhe_type(&self) -> FheType {
        match self {
            PlaintextValue::Bool(_) => FheType::Bool,
            PlaintextValue::Uint8(_) => FheType::Uint8,
            PlaintextValue::Uint16(_) => FheType::Uint16,
            PlaintextValue::Uint32(_) => FheType::Uint32,
            PlaintextValue::Uint64(_) => FheType::Uint64,
            PlaintextValue::Address(_) => FheType::Address,
        }
    }

    pub fn as_u256(&self) -> U256 {
        match self {
            PlaintextValue::Bool(v) => U256::from(*v as u8),
            PlaintextValue::Uint8(v) => U256::from(*v),
            PlaintextValue::Uint16(v) => U256::from(*v),
            PlaintextValue::Uint32(v) => U256::from(*v),
            PlaintextValue::Uint64(v) => U256::from(*v),
            PlaintextValue::Address(v) => U256::from_be_slice(v.as_slice()),
        }
    }

    /// Little-endian 16-bit limbs, `fhe_type().limbs()` of them.
    pub fn to_limbs(&self) -> Vec<u64> {
        let value = self.as_u256();
        (0..self.fhe_type().limbs())
            .map(|i| (value >> (i * LIMB_BITS)).as_limbs()[0] & LIMB_MASK)
            .collect()
    }
}

impl From<bool> for PlaintextValue {
    fn from(value: bool) -> Self {
        PlaintextValue::Bool(value)
    }
}

impl From<u8> for PlaintextValue {
    fn from(value: u8) -> Self {
        PlaintextValue::Uint8(value)
    }
}

impl From<u16> for PlaintextValue {
    fn from(value: u16) -> Self {
        PlaintextValue::Uint16(value)
    }
}

impl From<u32> for PlaintextValue {
    fn from(value: u32) -> Self {
        PlaintextValue::Uint32(value)
    }
}

impl From<u64> for PlaintextValue {
    fn from(value: u64) -> Self {
        PlaintextValue::Uint64(value)
    }
}

impl From<Address> for PlaintextValue {
    fn from(value: Address) -> Self {
        PlaintextValue::Address(value)
    }
}

/// Pack a batch of values into one limb vector, in order.
pub fn pack_limbs(values: &[PlaintextValue]) -> Vec<u64> {
    values.iter().flat_map(|v| v.to_limbs()).collect()
}

/// A decrypted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearValue {
    Bool(bool),
    Uint(U256),
    Address(Address),
}

impl ClearValue {
    /// Interpret a raw decrypted word according to the handle's type.
    pub fn decode(fhe_type: FheType, raw: U256) -> Result<Self> {
        if raw.bit_len() > fhe_type.bits() {
            bail!("decrypted value does not fit in {}", fhe_type);
        }
        Ok(match fhe_type {
            FheType::Bool => ClearValue::Bool(raw == U256::from(1)),
            FheType::Address => {
                ClearValue::Address(Address::from_word(B256::from(raw.to_be_bytes::<32>())))
            }
            _ => ClearValue::Uint(raw),
        })
    }
}

impl fmt::Display for ClearValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearValue::Bool(v) => write!(f, "{v}"),
            ClearValue::Uint(v) => write!(f, "{v}"),
            ClearValue::Address(v) => write!(f, "{v}"),
        }
    }
}

/// Rust types that have an encrypted counterpart on the ledger.
pub trait FheValue: Sized + Send + Sync + 'static {
    const FHE_TYPE: FheType;

    fn from_clear(value: &ClearValue) -> Option<Self>;

    fn into_plaintext(self) -> PlaintextValue;
}

impl FheValue for bool {
    const FHE_TYPE: FheType = FheType::Bool;

    fn from_clear(value: &ClearValue) -> Option<Self> {
        match value {
            ClearValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn into_plaintext(self) -> PlaintextValue {
        PlaintextValue::Bool(self)
    }
}

impl FheValue for Address {
    const FHE_TYPE: FheType = FheType::Address;

    fn from_clear(value: &ClearValue) -> Option<Self> {
        match value {
            ClearValue::Address(v) => Some(*v),
            _ => None,
        }
    }

    fn into_plaintext(self) -> PlaintextValue {
        PlaintextValue::Address(self)
    }
}

macro_rules! impl_fhe_uint {
    ($ty:ty, $variant:ident) => {
        impl FheValue for $ty {
            const FHE_TYPE: FheType = FheType::$variant;

            fn from_clear(value: &ClearValue) -> Option<Self> {
                match value {
                    ClearValue::Uint(v) => <$ty>::try_from(*v).ok(),
                    _ => None,
                }
            }

            fn into_plaintext(self) -> PlaintextValue {
                PlaintextValue::$variant(self)
            }
        }
    };
}

impl_fhe_uint!(u8, Uint8);
impl_fhe_uint!(u16, Uint16);
impl_fhe_uint!(u32, Uint32);
impl_fhe_uint!(u64, Uint64);
