// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "Ether".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// The network the wallet must be bound to before anything is encrypted for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer_url: Option<String>,
    pub native_currency: NativeCurrency,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "hardhat".to_string(),
            chain_id: 31337,
            rpc_url: "http://localhost:8545".to_string(),
            explorer_url: None,
            native_currency: NativeCurrency::default(),
        }
    }
}

impl ChainConfig {
    /// Parsed rpc url. Only http(s) and ws(s) endpoints are accepted.
    pub fn rpc_url(&self) -> Result<Url> {
        let url = Url::parse(&self.rpc_url)
            .with_context(|| format!("Invalid rpc url for chain {}", self.name))?;
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => {}
            other => bail!(
                "Invalid protocol '{}' for chain {}. Expected: http://, https://, ws://, wss://",
                other,
                self.name
            ),
        }
        if url.host_str().is_none() {
            return Err(anyhow!("rpc url for chain {} must contain a host", self.name));
        }
        Ok(url)
    }

    pub fn is_local(&self) -> bool {
        self.rpc_url()
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
            .map(|host| match host.as_str() {
                "localhost" | "127.0.0.1" | "::1" | "[::1]" => true,
                host => host.starts_with("127."),
            })
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct ContractAddresses {
    /// The confidential trading contract
    pub trading: Address,
    /// Verifying contract of the user decryption EIP-712 domain
    pub decryption_verifier: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayerConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecryptionConfig {
    /// How long a signed decryption authorization stays valid
    pub validity_days: u64,
}

impl Default for DecryptionConfig {
    fn default() -> Self {
        Self { validity_days: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub poll_interval_ms: u64,
    /// No timeout when unset: a stuck transaction waits until the node answers.
    pub receipt_timeout_ms: Option<u64>,
    pub read_retry_attempts: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            receipt_timeout_ms: None,
            read_retry_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_url_validation() {
        let mut chain = ChainConfig::default();
        assert!(chain.rpc_url().is_ok());
        assert!(chain.is_local());

        chain.rpc_url = "wss://sepolia.example.org/ws".to_string();
        assert!(chain.rpc_url().is_ok());
        assert!(!chain.is_local());

        chain.rpc_url = "ftp://sepolia.example.org".to_string();
        assert!(chain.rpc_url().is_err());

        chain.rpc_url = "not a url".to_string();
        assert!(chain.rpc_url().is_err());
    }
}
