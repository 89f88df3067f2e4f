use clap::Subcommand;
use tracing::info;

use super::atomic::read_file;
use super::wallet::KeySource;
use crate::account::AccountOwner;
use crate::client::CoordinatorClient;
use crate::config::HermezConfig;
use crate::error::{HermezError, Result};
use crate::identity::BjjWallet;
use crate::transaction::{resolve_transfer, FeeSelector, PoolTxRequest};

#[derive(Subcommand)]
pub enum TransferCommands {
    /// Resolve a single L2 transfer and print its unsigned wire JSON
    Prepare {
        #[command(flatten)]
        key: KeySource,
        /// `hez:0x…` / `0x…` Ethereum address or `hez:…` BJJ address
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        token: String,
        /// Token base units
        #[arg(long)]
        amount: String,
        #[arg(long, default_value_t = 0)]
        fee_selector: u8,
    },
    /// Submit a signed transaction to the plain pool
    Submit {
        #[arg(long)]
        tx: String,
    },
}

pub async fn handle_transfer_command(cmd: TransferCommands, config: &HermezConfig) -> Result<()> {
    let client = CoordinatorClient::from_config(&config.client)?;
    match cmd {
        TransferCommands::Prepare {
            key,
            recipient,
            token,
            amount,
            fee_selector,
        } => {
            let sender = BjjWallet::from_eth_signer(&key.load()?)?;
            let recipient: AccountOwner = recipient.parse()?;
            let amount = amount
                .parse::<u128>()
                .map_err(|e| HermezError::Serialization(format!("amount {}: {}", amount, e)))?;
            let tx = resolve_transfer(&client, &sender, &recipient, &token, amount, FeeSelector(fee_selector)).await?;
            info!("Prepared transfer {} from {}", tx.id, sender.hez_eth_address());
            println!("{}", serde_json::to_string_pretty(&PoolTxRequest::from(&tx))?);
            Ok(())
        }
        TransferCommands::Submit { tx } => {
            let request: PoolTxRequest = serde_json::from_str(&read_file(&tx)?)?;
            let response = client.submit_transaction_request(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}
