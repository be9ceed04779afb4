// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

pub mod authorization;
mod backend;
pub mod bfv;
mod handle;
mod keys;
pub mod relayer;
mod values;

pub use backend::{FheBackend, HandleContractPair, NetworkContext, UserDecryptRequest};
pub use handle::{EncryptedInput, Handle, HandleError, TypedHandle, HANDLE_VERSION};
pub use keys::{seal, KeyPair, SealedValue};
pub use relayer::{RelayerBackend, RelayerError};
pub use values::{pack_limbs, ClearValue, FheType, FheValue, PlaintextValue};
