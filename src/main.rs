use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use rust_hermez::cli::{self, Cli};
use rust_hermez::config::HermezConfig;

/// `log_level` from the config file if it parses; RUST_LOG wins over both.
fn init_tracing(config_path: &str) {
    let level = std::fs::read_to_string(config_path)
        .ok()
        .and_then(|s| HermezConfig::from_toml(&s).ok())
        .map(|c| c.client.log_level)
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.config);

    let config = HermezConfig::load_or_default(&cli.config);
    if let Err(e) = cli::run(cli.command, &config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
