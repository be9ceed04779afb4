// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::telemetry::setup_simple_tracing;
use crate::helpers::{ensure_private_key, parse_position_id};
use crate::{close, decrypt, open, positions, price, reveal, status};
use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use shade_config::{load_config, AppConfig};
use tracing::{info, instrument, Level};
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(name = "shade")]
#[command(about = "Open, inspect and decrypt confidential positions", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,

    /// Indicate error levels by adding additional `-v` arguments. Eg. `shade -vvv` will give you
    /// trace level output
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true
    )]
    pub verbose: u8,

    /// Silence all output. This argument cannot be used alongside `-v`
    #[arg(
        short,
        long,
        action = ArgAction::SetTrue,
        conflicts_with = "verbose",
        global = true
    )]
    quiet: bool,

    /// Key that signs transactions and decryption requests
    #[arg(
        long = "private-key",
        env = "SHADE_PRIVATE_KEY",
        hide_env_values = true,
        value_parser = ensure_private_key,
        global = true
    )]
    private_key: Option<Zeroizing<String>>,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,  //
                1 => Level::INFO,  // -v
                2 => Level::DEBUG, // -vv
                _ => Level::TRACE, // -vvv
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn execute(self) -> Result<()> {
        setup_simple_tracing(self.log_level());
        let config = self.load_config()?;
        info!("Config loaded from: {:?}", config.config_file());

        match self.command {
            Commands::Status => status::execute(&config, self.private_key.as_ref()).await?,
            Commands::Price => price::execute(&config).await?,
            Commands::Positions { owner } => {
                positions::execute(&config, owner, self.private_key.as_ref()).await?
            }
            Commands::Open {
                long,
                short: _,
                size,
                leverage,
            } => {
                let key = require_key(self.private_key)?;
                open::execute(&config, &key, long, &size, leverage).await?
            }
            Commands::Close { id } => close::execute(&config, &require_key(self.private_key)?, id).await?,
            Commands::Reveal { id } => {
                reveal::execute(&config, &require_key(self.private_key)?, id).await?
            }
            Commands::Decrypt { id } => {
                decrypt::execute(&config, &require_key(self.private_key)?, id).await?
            }
        }

        Ok(())
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        load_config(self.config.clone())
    }
}

fn require_key(key: Option<Zeroizing<String>>) -> Result<Zeroizing<String>> {
    key.ok_or_else(|| anyhow!("This command needs --private-key or SHADE_PRIVATE_KEY"))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the configured network, contract and client readiness
    Status,

    /// Print the public mark price
    Price,

    /// List position ids of an owner (defaults to your wallet)
    Positions {
        #[arg(long)]
        owner: Option<Address>,
    },

    /// Open a position with encrypted direction and size
    #[command(group(ArgGroup::new("side").required(true).args(["long", "short"])))]
    Open {
        #[arg(long)]
        long: bool,

        #[arg(long)]
        short: bool,

        /// Size in units, eg. `1.5`
        #[arg(long)]
        size: String,

        #[arg(long, default_value_t = 1)]
        leverage: u64,
    },

    /// Close a position
    Close {
        #[arg(value_parser = parse_position_id)]
        id: U256,
    },

    /// Publish a position in cleartext on chain
    Reveal {
        #[arg(value_parser = parse_position_id)]
        id: U256,
    },

    /// Privately decrypt one of your positions
    Decrypt {
        #[arg(value_parser = parse_position_id)]
        id: U256,
    },
}
