use clap::Subcommand;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::account::AccountOwner;
use crate::client::CoordinatorClient;
use crate::config::HermezConfig;
use crate::crypto::EthKey;
use crate::error::{HermezError, Result};
use crate::identity::BjjWallet;
use crate::transaction::{AtomicGroupBuilder, AtomicGroupRequest, FeeSelector, TransferIntent, TxId};

#[derive(Subcommand)]
pub enum AtomicCommands {
    /// Resolve, link and identify a group from a JSON intents file
    Prepare {
        #[arg(long)]
        intents: String,
    },
    /// Submit a signed group (wire JSON, as `prepare` prints it plus signatures)
    Submit {
        #[arg(long)]
        group: String,
        /// Keep polling until the whole group is forged
        #[arg(long)]
        wait: bool,
    },
    /// Poll the coordinator until every transaction is forged
    Wait {
        #[arg(long = "tx-id", required = true)]
        tx_ids: Vec<TxId>,
        #[arg(long)]
        interval_secs: Option<u64>,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
}

/// One entry of the intents file
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntentEntry {
    pub sender_key: String,
    pub recipient: String,
    pub token: String,
    /// decimal string in token base units
    pub amount: String,
    pub fee_selector: u8,
    pub rq_offset: u8,
}

impl IntentEntry {
    pub fn amount(&self) -> Result<u128> {
        self.amount
            .parse::<u128>()
            .map_err(|e| HermezError::Serialization(format!("amount {}: {}", self.amount, e)))
    }
}

pub fn parse_intents(json: &str) -> Result<Vec<IntentEntry>> {
    Ok(serde_json::from_str(json)?)
}

pub(crate) fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| HermezError::Config(format!("reading {}: {}", path, e)))
}

pub async fn handle_atomic_command(cmd: AtomicCommands, config: &HermezConfig) -> Result<()> {
    let client = CoordinatorClient::from_config(&config.client)?;
    match cmd {
        AtomicCommands::Prepare { intents } => {
            let entries = parse_intents(&read_file(&intents)?)?;

            let wallets = entries
                .iter()
                .map(|e| EthKey::from_hex(&e.sender_key).and_then(|k| BjjWallet::from_eth_signer(&k)))
                .collect::<Result<Vec<_>>>()?;
            let transfers = entries
                .iter()
                .zip(&wallets)
                .map(|(entry, sender)| -> Result<TransferIntent> {
                    Ok(TransferIntent {
                        sender,
                        recipient: entry.recipient.parse::<AccountOwner>()?,
                        token_symbol: entry.token.clone(),
                        amount: entry.amount()?,
                        fee_selector: FeeSelector(entry.fee_selector),
                        rq_offset: entry.rq_offset,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let group = AtomicGroupBuilder::new(&client).build(&transfers).await?.identify();
            info!("Prepared atomic group with {} transactions", group.transactions().len());
            let request = AtomicGroupRequest::try_from(&group)?;
            println!("{}", serde_json::to_string_pretty(&request)?);
            Ok(())
        }
        AtomicCommands::Submit { group, wait } => {
            let request: AtomicGroupRequest = serde_json::from_str(&read_file(&group)?)?;
            let response = client.submit_atomic_request(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if wait {
                let tx_ids: Vec<TxId> = request.transactions.iter().map(|tx| tx.id).collect();
                let interval = Duration::from_secs(config.client.poll_interval_secs);
                client
                    .wait_until_forged(&tx_ids, interval, config.client.max_poll_attempts)
                    .await?;
                println!("Atomic group {} forged", request.atomic_group_id);
            }
            Ok(())
        }
        AtomicCommands::Wait {
            tx_ids,
            interval_secs,
            max_attempts,
        } => {
            let interval = Duration::from_secs(interval_secs.unwrap_or(config.client.poll_interval_secs));
            let attempts = max_attempts.unwrap_or(config.client.max_poll_attempts);
            client.wait_until_forged(&tx_ids, interval, attempts).await?;
            println!("All {} transactions forged", tx_ids.len());
            Ok(())
        }
    }
}
