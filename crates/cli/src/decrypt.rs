// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::client;
use alloy::primitives::U256;
use anyhow::Result;
use shade_config::AppConfig;
use shade_sdk::scale::{format_fixed, PRICE_DECIMALS, QUANTITY_DECIMALS};
use zeroize::Zeroizing;

pub async fn execute(config: &AppConfig, private_key: &Zeroizing<String>, id: U256) -> Result<()> {
    let client = client::connect(config, private_key).await?;
    let view = match client.decrypt_position(id).await {
        Ok(view) => view,
        Err(err) if err.is_user_rejection() => {
            println!("Cancelled: decryption request rejected by user");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    println!("position {}", view.id);
    println!("  side:        {}", if view.is_long { "long" } else { "short" });
    println!("  size:        {}", format_fixed(U256::from(view.size), QUANTITY_DECIMALS));
    println!("  leverage:    {}x", view.leverage);
    println!("  entry price: {}", format_fixed(view.entry_price, PRICE_DECIMALS));
    println!("  open:        {}", view.is_open);
    println!("  revealed:    {}", view.is_revealed);
    Ok(())
}
