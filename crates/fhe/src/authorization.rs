// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::{eip712_domain, Eip712Domain},
};

pub const DOMAIN_NAME: &str = "Decryption";
pub const DOMAIN_VERSION: &str = "1";
/// `extraData` of every authorization; the decrypt request must carry the same bytes.
pub const EXTRA_DATA: &[u8] = &[0x00];

sol! {
    /// What the user signs to let the decryption service reveal handles to them.
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationDays;
        bytes extraData;
    }
}

pub fn decryption_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    eip712_domain! {
        name: DOMAIN_NAME,
        version: DOMAIN_VERSION,
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

/// Typed data for a user decryption authorization, ready for `eth_signTypedData_v4`.
pub fn authorization_typed_data(
    chain_id: u64,
    verifying_contract: Address,
    public_key: &[u8],
    contract_addresses: &[Address],
    start_timestamp: u64,
    duration_days: u64,
) -> TypedData {
    let message = UserDecryptRequestVerification {
        publicKey: Bytes::copy_from_slice(public_key),
        contractAddresses: contract_addresses.to_vec(),
        startTimestamp: U256::from(start_timestamp),
        durationDays: U256::from(duration_days),
        extraData: Bytes::from_static(EXTRA_DATA),
    };
    TypedData::from_struct(&message, Some(decryption_domain(chain_id, verifying_contract)))
}
