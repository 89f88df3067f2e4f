use clap::Subcommand;

use crate::client::CoordinatorClient;
use crate::config::HermezConfig;
use crate::error::{HermezError, Result};
use crate::transaction::{PoolTxApi, TxId};

#[derive(Subcommand)]
pub enum PoolCommands {
    /// Transactions currently in the coordinator's pool
    List,
    /// One pool transaction by id
    Get {
        #[arg(long = "tx-id")]
        tx_id: TxId,
    },
}

fn summary(tx: &PoolTxApi) -> String {
    format!(
        "{} {} {} -> {} {} {} [{}]",
        tx.id,
        tx.tx_type,
        tx.from_account_index,
        tx.to_account_index.as_deref().unwrap_or("-"),
        tx.amount,
        tx.token.symbol,
        tx.state
    )
}

pub async fn handle_pool_command(cmd: PoolCommands, config: &HermezConfig) -> Result<()> {
    let client = CoordinatorClient::from_config(&config.client)?;
    match cmd {
        PoolCommands::List => {
            let txs = client.get_pool_transactions().await?;
            for tx in &txs {
                println!("{}", summary(tx));
            }
            println!("{} transactions in pool", txs.len());
            Ok(())
        }
        PoolCommands::Get { tx_id } => match client.get_pool_transaction(&tx_id).await? {
            Some(tx) => {
                println!("{}", serde_json::to_string_pretty(&tx)?);
                Ok(())
            }
            None => Err(HermezError::Coordinator {
                status: 404,
                body: format!("{} is not in the pool", tx_id),
            }),
        },
    }
}

pub async fn list_tokens(config: &HermezConfig) -> Result<()> {
    let client = CoordinatorClient::from_config(&config.client)?;
    for token in client.get_tokens().await? {
        println!("{:>4} {:<8} {:<32} {} decimals", token.id, token.symbol, token.name, token.decimals);
    }
    Ok(())
}
