// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{client, report::run_action};
use anyhow::Result;
use shade_config::AppConfig;
use shade_sdk::scale::{parse_fixed, QUANTITY_DECIMALS};
use zeroize::Zeroizing;

pub async fn execute(
    config: &AppConfig,
    private_key: &Zeroizing<String>,
    long: bool,
    size: &str,
    leverage: u64,
) -> Result<()> {
    let size = parse_fixed(size, QUANTITY_DECIMALS)?;
    let client = client::connect(config, private_key).await?;

    run_action(
        client.open_orchestrator(),
        client.open_position(long, size, leverage),
    )
    .await
}
