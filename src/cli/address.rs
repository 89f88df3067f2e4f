use clap::Subcommand;

use crate::address::HezBjjAddress;
use crate::error::{HermezError, Result};

#[derive(Subcommand)]
pub enum AddressCommands {
    /// Compressed BJJ key (32 bytes hex, native order) to `hez:` address
    Encode { key: String },
    /// `hez:` address back to the compressed key, checking the checksum
    Decode { address: String },
}

pub fn handle_address_command(cmd: AddressCommands) -> Result<()> {
    match cmd {
        AddressCommands::Encode { key } => {
            let body = key.strip_prefix("0x").unwrap_or(&key);
            let bytes = hex::decode(body).map_err(|e| HermezError::InvalidHex(format!("{}: {}", key, e)))?;
            println!("{}", HezBjjAddress::encode(&bytes)?);
        }
        AddressCommands::Decode { address } => {
            let address: HezBjjAddress = address.parse()?;
            println!("0x{}", hex::encode(address.decode()?));
        }
    }
    Ok(())
}
