// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::primitives::U256;
use anyhow::{bail, Result};
use zeroize::{Zeroize, Zeroizing};

pub mod telemetry;

/// Parse to a Zeroizing String
pub fn parse_zeroizing(s: &str) -> Result<Zeroizing<String>> {
    Ok(Zeroizing::new(s.to_string()))
}

/// Ensure a private key of the form 0x followed by 32 hex encoded bytes
pub fn ensure_private_key(s: &str) -> Result<Zeroizing<String>> {
    parse_zeroizing(ensure_hex(s)?)
}

fn ensure_hex(s: &str) -> Result<&str> {
    if !s.starts_with("0x") {
        bail!("hex value must start with '0x'")
    }
    if !s[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("private key must only contain hex characters [0-9a-fA-F]");
    }
    let mut bytes = hex::decode(&s[2..])?;
    let len = bytes.len();
    bytes.zeroize();
    if len != 32 {
        bail!("private key must be 32 bytes, got {}", len);
    }
    Ok(s)
}

/// Position ids are plain decimal numbers on the command line
pub fn parse_position_id(s: &str) -> Result<U256> {
    Ok(U256::from_str_radix(s, 10)?)
}
