// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{anyhow, Context, Result};
use shade_config::AppConfig;
use shade_evm_helpers::{
    contracts::{
        ContractOptions, TradingContract, TradingRead, TradingReadContract, TradingWriteContract,
    },
    wallet::NativeCurrencyParams,
    AddChainParams, LocalWallet, Wallet,
};
use shade_fhe::{NetworkContext, RelayerBackend};
use shade_sdk::{EncryptionContext, TradingClient};
use std::{sync::Arc, time::Duration};
use tracing::info;
use zeroize::Zeroizing;

fn contract_options(config: &AppConfig) -> ContractOptions {
    let tx = &config.transactions;
    ContractOptions {
        poll_interval: Duration::from_millis(tx.poll_interval_ms),
        receipt_timeout: tx.receipt_timeout_ms.map(Duration::from_millis),
        read_retry_attempts: tx.read_retry_attempts,
    }
}

fn network(config: &AppConfig) -> NetworkContext {
    NetworkContext {
        chain_id: config.chain.chain_id,
        chain_name: config.chain.name.clone(),
        rpc_url: config.chain.rpc_url.clone(),
        verifying_contract: config.contracts.decryption_verifier,
    }
}

fn add_chain_params(config: &AppConfig) -> AddChainParams {
    let chain = &config.chain;
    AddChainParams {
        chain_id: chain.chain_id,
        chain_name: chain.name.clone(),
        native_currency: NativeCurrencyParams {
            name: chain.native_currency.name.clone(),
            symbol: chain.native_currency.symbol.clone(),
            decimals: chain.native_currency.decimals,
        },
        rpc_urls: vec![chain.rpc_url.clone()],
        block_explorer_urls: chain.explorer_url.iter().cloned().collect(),
    }
}

/// Reads only; no key needed.
pub async fn connect_read_only(config: &AppConfig) -> Result<TradingReadContract> {
    let rpc = config.chain.rpc_url()?;
    let contract = TradingContract::read_only(
        rpc.as_str(),
        &config.contracts.trading.to_string(),
        contract_options(config),
    )
    .await
    .map_err(|e| anyhow!("{e:#}"))
    .context("Could not connect to the trading contract")?;
    Ok(contract)
}

pub async fn read_only(config: &AppConfig) -> Result<Arc<dyn TradingRead>> {
    Ok(Arc::new(connect_read_only(config).await?))
}

/// A trading client with an initialized encryption context.
pub async fn connect(config: &AppConfig, private_key: &Zeroizing<String>) -> Result<TradingClient> {
    let rpc = config.chain.rpc_url()?;
    let contract: TradingWriteContract = TradingContract::new(
        rpc.as_str(),
        private_key,
        &config.contracts.trading.to_string(),
        contract_options(config),
    )
    .await
    .map_err(|e| anyhow!("{e:#}"))
    .context("Could not connect to the trading contract")?;

    let wallet = LocalWallet::from_private_key(private_key, config.chain.chain_id)
        .map_err(|e| anyhow!("{e:#}"))
        .context("Invalid private key")?;
    info!("Using wallet {}", wallet.address());

    let backend = RelayerBackend::new(
        &config.relayer.url,
        Duration::from_millis(config.relayer.timeout_ms),
    )?;
    let context = EncryptionContext::new(Arc::new(backend), Arc::new(wallet), network(config))
        .with_add_chain_params(add_chain_params(config))
        .with_validity_days(config.decryption.validity_days);
    context.initialize().await?;

    let contract = Arc::new(contract);
    Ok(TradingClient::new(
        context,
        config.contracts.trading,
        contract.clone(),
        contract.clone(),
        contract,
    ))
}
