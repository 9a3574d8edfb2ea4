//! Configuration management for emberchain

use crate::blockchain::GENESIS_FUNDS;
use serde::Deserialize;
use std::fs;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainSettings {
    /// Proof-of-work difficulty for every block on the chain; fixed at
    /// construction.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    /// Embers created by the genesis block.
    #[serde(default = "default_genesis_funds")]
    pub genesis_funds: i64,
    /// Hex-encoded public key the genesis funds are paid to; empty means
    /// the default self-paying genesis record.
    #[serde(default)]
    pub genesis_beneficiary: String,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            genesis_funds: default_genesis_funds(),
            genesis_beneficiary: String::new(),
        }
    }
}

fn default_difficulty() -> u32 {
    8
}

fn default_genesis_funds() -> i64 {
    GENESIS_FUNDS
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    load_config_from("emberchain.toml")
}

pub fn load_config_from(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        // Provide sane defaults when the config file is absent
        Config {
            chain: ChainSettings::default(),
        }
    } else {
        toml::from_str(&config_str)?
    };

    // Validate critical values
    if config.chain.genesis_funds < 0 {
        return Err("chain.genesis_funds must be non-negative".into());
    }

    if config.chain.difficulty > 32 {
        warn!(
            "chain.difficulty = {} will stall mining for a very long time; \
             there is no timeout on the nonce search",
            config.chain.difficulty
        );
    }

    Ok(config)
}
