// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::client;
use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use anyhow::{bail, Result};
use shade_config::AppConfig;
use zeroize::Zeroizing;

pub async fn execute(
    config: &AppConfig,
    owner: Option<Address>,
    private_key: Option<&Zeroizing<String>>,
) -> Result<()> {
    let owner = match (owner, private_key) {
        (Some(owner), _) => owner,
        (None, Some(key)) => key.parse::<PrivateKeySigner>()?.address(),
        (None, None) => bail!("Pass --owner or a private key"),
    };

    let reader = client::read_only(config).await?;
    let ids = reader
        .positions_of(owner)
        .await
        .map_err(|e| anyhow::anyhow!("{e:#}"))?;
    if ids.is_empty() {
        println!("No positions for {}", owner);
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}
