pub mod account;
pub mod address;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod transaction;

#[cfg(test)]
mod test_utils;

pub use error::{HermezError, Result};
