// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::client;
use anyhow::{anyhow, Result};
use shade_config::AppConfig;
use shade_sdk::scale::{format_fixed, PRICE_DECIMALS};

pub async fn execute(config: &AppConfig) -> Result<()> {
    let reader = client::read_only(config).await?;
    let price = reader.mark_price().await.map_err(|e| anyhow!("{e:#}"))?;
    println!("{}", format_fixed(price, PRICE_DECIMALS));
    Ok(())
}
