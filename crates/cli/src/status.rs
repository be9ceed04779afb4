// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::client;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Result;
use serde_json::json;
use shade_config::AppConfig;
use shade_sdk::scale::{format_fixed, PRICE_DECIMALS};
use zeroize::Zeroizing;

pub async fn execute(config: &AppConfig, private_key: Option<&Zeroizing<String>>) -> Result<()> {
    let reader = client::read_only(config).await?;
    let paused = reader.is_paused().await.ok();
    let price = reader
        .mark_price()
        .await
        .ok()
        .map(|p| format_fixed(p, PRICE_DECIMALS));

    let (context, wallet) = match private_key {
        Some(key) => {
            let wallet = key.parse::<PrivateKeySigner>()?.address();
            match client::connect(config, key).await {
                Ok(client) => (client.context().state().to_string(), Some(wallet)),
                Err(err) => (format!("failed: {err:#}"), Some(wallet)),
            }
        }
        None => ("no private key".to_string(), None),
    };

    let status = json!({
        "chain": {
            "name": config.chain.name,
            "chainId": config.chain.chain_id,
            "rpcUrl": config.chain.rpc_url,
        },
        "trading": config.contracts.trading,
        "relayer": config.relayer.url,
        "paused": paused,
        "markPrice": price,
        "encryptionContext": context,
        "wallet": wallet,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
