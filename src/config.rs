use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::auth::check_chain_id;
use crate::crypto::EthAddress;
use crate::error::{HermezError, Result};

/// Loaded once at startup and passed by reference; never mutated afterwards.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HermezConfig {
    pub client: ClientConfig,
    #[serde(default = "default_networks")]
    pub networks: BTreeMap<String, NetworkDefinition>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    pub coordinator_url: String,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// Hermez contracts deployed on one Ethereum network
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NetworkDefinition {
    pub chain_id: u64,
    pub rollup_contract: EthAddress,
    pub auction_contract: EthAddress,
}

impl NetworkDefinition {
    pub fn chain_id(&self) -> Result<u16> {
        check_chain_id(self.chain_id)
    }
}

fn default_network() -> String {
    "goerli".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_max_poll_attempts() -> u32 {
    40
}

const MAINNET_ROLLUP: EthAddress = EthAddress([
    0xa6, 0x8d, 0x85, 0xdf, 0x56, 0xe7, 0x33, 0xa0, 0x64, 0x43,
    0x30, 0x6a, 0x09, 0x56, 0x46, 0x31, 0x7b, 0x5f, 0xa6, 0x33,
]);
const MAINNET_AUCTION: EthAddress = EthAddress([
    0x15, 0x46, 0x8b, 0x45, 0xed, 0x46, 0xc8, 0x38, 0x3f, 0x5c,
    0x0b, 0x1b, 0x6c, 0xf2, 0xec, 0xf4, 0x03, 0xc2, 0xae, 0xc2,
]);
const RINKEBY_ROLLUP: EthAddress = EthAddress([
    0x0a, 0x8a, 0x6d, 0x65, 0xad, 0x90, 0x46, 0xc2, 0xa5, 0x7a,
    0x5c, 0xa8, 0xba, 0xb2, 0xae, 0x9c, 0x33, 0x45, 0x31, 0x6d,
]);
const GOERLI_ROLLUP: EthAddress = EthAddress([
    0xe6, 0xe5, 0x6c, 0x74, 0x63, 0x0f, 0x8e, 0xe8, 0x24, 0x03,
    0x93, 0x08, 0x79, 0x46, 0x39, 0xd5, 0xa0, 0x2b, 0xf9, 0xe5,
]);
const GOERLI_AUCTION: EthAddress = EthAddress([
    0x74, 0x89, 0x64, 0xf2, 0x2e, 0xfd, 0x02, 0x3e, 0xb7, 0x8a,
    0x24, 0x6a, 0x7a, 0xc2, 0x50, 0x6e, 0x84, 0xcc, 0x45, 0x45,
]);

fn network(chain_id: u64, rollup_contract: EthAddress, auction_contract: EthAddress) -> NetworkDefinition {
    NetworkDefinition {
        chain_id,
        rollup_contract,
        auction_contract,
    }
}

fn default_networks() -> BTreeMap<String, NetworkDefinition> {
    let mut networks = BTreeMap::new();
    networks.insert("mainnet".to_string(), network(1, MAINNET_ROLLUP, MAINNET_AUCTION));
    // rinkeby shares the mainnet auction deployment address
    networks.insert("rinkeby".to_string(), network(4, RINKEBY_ROLLUP, MAINNET_AUCTION));
    networks.insert("goerli".to_string(), network(5, GOERLI_ROLLUP, GOERLI_AUCTION));
    networks
}

impl Default for HermezConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig {
                coordinator_url: "http://localhost:8086".to_string(),
                network: default_network(),
                log_level: default_log_level(),
                request_timeout_secs: default_request_timeout_secs(),
                poll_interval_secs: default_poll_interval_secs(),
                max_poll_attempts: default_max_poll_attempts(),
            },
            networks: default_networks(),
        }
    }
}

impl HermezConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match Self::from_toml(&s) {
                    Ok(c) => {
                        info!("Config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        warn!("Error parsing config: {}. Using defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Error reading config: {}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            info!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            match toml::to_string_pretty(&config) {
                Ok(s) => {
                    if let Err(e) = std::fs::write(path, s) {
                        warn!("Could not write default config to {}: {}", path, e);
                    }
                }
                Err(e) => warn!("Could not serialize default config: {}", e),
            }
            config
        }
    }

    pub fn network(&self, name: &str) -> Result<&NetworkDefinition> {
        self.networks
            .get(name)
            .ok_or_else(|| HermezError::NetworkNotFound(name.to_string()))
    }

    /// The network selected in `[client]`
    pub fn active_network(&self) -> Result<&NetworkDefinition> {
        self.network(&self.client.network)
    }
}
