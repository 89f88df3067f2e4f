pub mod address;
pub mod atomic;
pub mod pool;
pub mod transfer;
pub mod wallet;

use clap::{Parser, Subcommand};

use crate::config::HermezConfig;
use crate::error::Result;

#[derive(Parser)]
#[command(name = "rust_hermez")]
#[command(about = "Hermez wallet derivation, transfers and atomic groups", long_about = None)]
pub struct Cli {
    /// Path to the TOML config, created with defaults when missing
    #[arg(long, global = true, default_value = "hermez.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// BJJ wallet derivation and account creation
    Wallet {
        #[command(subcommand)]
        cmd: wallet::WalletCommands,
    },
    /// Display address encoding
    Address {
        #[command(subcommand)]
        cmd: address::AddressCommands,
    },
    /// Atomic transaction groups
    Atomic {
        #[command(subcommand)]
        cmd: atomic::AtomicCommands,
    },
    /// Single L2 transfers
    Transfer {
        #[command(subcommand)]
        cmd: transfer::TransferCommands,
    },
    /// Coordinator transaction pool
    Pool {
        #[command(subcommand)]
        cmd: pool::PoolCommands,
    },
    /// Tokens registered on the network
    Tokens,
}

pub async fn run(command: Commands, config: &HermezConfig) -> Result<()> {
    match command {
        Commands::Wallet { cmd } => wallet::handle_wallet_command(cmd, config).await,
        Commands::Address { cmd } => address::handle_address_command(cmd),
        Commands::Atomic { cmd } => atomic::handle_atomic_command(cmd, config).await,
        Commands::Transfer { cmd } => transfer::handle_transfer_command(cmd, config).await,
        Commands::Pool { cmd } => pool::handle_pool_command(cmd, config).await,
        Commands::Tokens => pool::list_tokens(config).await,
    }
}
