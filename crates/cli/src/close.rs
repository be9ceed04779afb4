// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{client, report::run_action};
use alloy::primitives::U256;
use anyhow::Result;
use shade_config::AppConfig;
use zeroize::Zeroizing;

pub async fn execute(config: &AppConfig, private_key: &Zeroizing<String>, id: U256) -> Result<()> {
    let client = client::connect(config, private_key).await?;
    run_action(client.close_orchestrator(), client.close_position(id)).await
}
