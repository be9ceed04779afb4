// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::chain_config::{
    ChainConfig, ContractAddresses, DecryptionConfig, RelayerConfig, TransactionConfig,
};
use crate::load_config::{find_in_parent, resolve_config_path, DEFAULT_CONFIG_NAME};
use crate::yaml::{load_yaml_with_env, substitute_env};
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{env, path::Path, path::PathBuf};
use tracing::info;

/// Everything the client runtime needs to talk to one deployment.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub contracts: ContractAddresses,
    pub relayer: RelayerConfig,
    pub decryption: DecryptionConfig,
    pub transactions: TransactionConfig,
    /// Where the configuration was read from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

impl AppConfig {
    /// Parse a yaml document on top of the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let yaml = substitute_env(yaml)?;
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::string(&yaml))
            .extract()
            .context("Could not parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.chain.rpc_url()?;
        if self.contracts.trading.is_zero() {
            bail!("contracts.trading must be set to the deployed trading contract");
        }
        if self.decryption.validity_days == 0 {
            bail!("decryption.validity_days must be at least 1");
        }
        if self.transactions.poll_interval_ms == 0 {
            bail!("transactions.poll_interval_ms must be greater than 0");
        }
        Ok(())
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }
}

/// Load the config at `config_file`, or search for `shade.config.yaml`.
pub fn load_config(config_file: Option<String>) -> Result<AppConfig> {
    let explicit = config_file.map(PathBuf::from);
    let resolved = resolve_config_path(
        find_in_parent,
        &env::current_dir()?,
        &OsDirs::config_dir(),
        DEFAULT_CONFIG_NAME,
        explicit.as_deref(),
    );

    let loaded_yaml = load_yaml_with_env(&resolved)?;
    let mut config = AppConfig::from_yaml_str(&loaded_yaml)
        .with_context(|| format!("Invalid configuration in {:?}", resolved))?;
    info!("Loaded configuration from {:?}", resolved);
    config.config_file = Some(resolved);
    Ok(config)
}

pub struct OsDirs;
impl OsDirs {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shade")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use figment::Jail;

    const CONFIG: &str = r#"
chain:
  name: "sepolia"
  chain_id: 11155111
  rpc_url: "https://rpc.sepolia.example.org"
  explorer_url: "https://sepolia.etherscan.io"
contracts:
  trading: "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
  decryption_verifier: "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9"
relayer:
  url: "https://relayer.example.org"
"#;

    #[test]
    fn test_deserialization_with_defaults() -> Result<()> {
        let config = AppConfig::from_yaml_str(CONFIG)?;

        assert_eq!(config.chain.name, "sepolia");
        assert_eq!(config.chain.chain_id, 11155111);
        assert_eq!(config.chain.native_currency.symbol, "ETH");
        assert_eq!(
            config.contracts.trading,
            address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0")
        );
        assert_eq!(config.relayer.url, "https://relayer.example.org");
        assert_eq!(config.relayer.timeout_ms, 30_000);
        assert_eq!(config.decryption.validity_days, 10);
        assert_eq!(config.transactions.receipt_timeout_ms, None);
        Ok(())
    }

    #[test]
    fn test_missing_trading_contract_is_rejected() {
        let err = AppConfig::from_yaml_str("relayer:\n  url: \"http://localhost:3000\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("contracts.trading"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let yaml = format!("{CONFIG}\nunknown_section: 1\n");
        assert!(AppConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_file_not_found() {
        let err = load_config(Some("/definitely/not/here/shade.config.yaml".to_string()))
            .unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_config_env_vars() {
        Jail::expect_with(|jail| {
            jail.set_env("TEST_RELAYER_HOST", "relayer.internal");
            jail.set_env(
                "TEST_TRADING_ADDRESS",
                "0x1234567890123456789012345678901234567890",
            );
            jail.create_file(
                DEFAULT_CONFIG_NAME,
                r#"
chain:
  chain_id: 31337
contracts:
  trading: "${TEST_TRADING_ADDRESS}"
relayer:
  url: "http://${TEST_RELAYER_HOST}:3000"
transactions:
  receipt_timeout_ms: 60000
"#,
            )?;

            let config = load_config(None).map_err(|err| err.to_string())?;

            assert_eq!(config.relayer.url, "http://relayer.internal:3000");
            assert_eq!(
                config.contracts.trading,
                address!("0x1234567890123456789012345678901234567890")
            );
            assert_eq!(config.transactions.receipt_timeout_ms, Some(60_000));
            assert!(config
                .config_file()
                .map(|p| p.ends_with(DEFAULT_CONFIG_NAME))
                .unwrap_or(false));
            Ok(())
        });
    }
}
