use clap::{Args, Subcommand};

use crate::auth::{self, AccountCreationRequest};
use crate::client::CoordinatorClient;
use crate::config::HermezConfig;
use crate::crypto::EthKey;
use crate::error::{HermezError, Result};
use crate::identity::{eth_key_from_mnemonic, BjjWallet};

/// Where the Ethereum key comes from
#[derive(Args, Clone)]
pub struct KeySource {
    /// Hex-encoded secp256k1 private key
    #[arg(long, conflicts_with = "mnemonic")]
    pub eth_key: Option<String>,
    /// BIP-39 phrase; the key is taken at m/44'/60'/0'/0/<index>
    #[arg(long)]
    pub mnemonic: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub index: u32,
}

impl KeySource {
    pub fn load(&self) -> Result<EthKey> {
        match (&self.eth_key, &self.mnemonic) {
            (Some(hex_key), _) => EthKey::from_hex(hex_key),
            (None, Some(phrase)) => eth_key_from_mnemonic(phrase, self.index),
            (None, None) => Err(HermezError::Config(
                "either --eth-key or --mnemonic is required".to_string(),
            )),
        }
    }
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Derive the BJJ wallet and print its addresses
    Derive {
        #[command(flatten)]
        key: KeySource,
    },
    /// Sign the account creation authorization
    Authorize {
        #[command(flatten)]
        key: KeySource,
        /// Network name from the config; defaults to [client].network
        #[arg(long)]
        network: Option<String>,
        /// Send it to the coordinator instead of only printing it
        #[arg(long)]
        submit: bool,
    },
}

pub async fn handle_wallet_command(cmd: WalletCommands, config: &HermezConfig) -> Result<()> {
    match cmd {
        WalletCommands::Derive { key } => {
            let eth_key = key.load()?;
            let wallet = BjjWallet::from_eth_signer(&eth_key)?;
            println!("Ethereum address: {}", wallet.eth_address);
            println!("Hez address:      {}", wallet.hez_eth_address());
            println!("BJJ address:      {}", wallet.hez_bjj_address);
            println!("BJJ public key:   0x{}", hex::encode(wallet.keypair.public_key_compressed()));
            Ok(())
        }
        WalletCommands::Authorize { key, network, submit } => {
            let eth_key = key.load()?;
            let network = match &network {
                Some(name) => config.network(name)?,
                None => config.active_network()?,
            };
            let wallet = BjjWallet::from_eth_signer(&eth_key)?;
            let auth = auth::authorize(
                &eth_key,
                &wallet.keypair.public_key_native(),
                network.chain_id,
                network.rollup_contract,
            )?;
            let request = AccountCreationRequest::new(&auth, &wallet.hez_bjj_address);
            println!("{}", serde_json::to_string_pretty(&request)?);

            if submit {
                let client = CoordinatorClient::from_config(&config.client)?;
                let response = client.submit_account_creation(&request).await?;
                println!("Coordinator response: {}", response);
            }
            Ok(())
        }
    }
}
