use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use super::model::Account;
use crate::address::{AccountIndex, HezBjjAddress};
use crate::crypto::EthAddress;
use crate::error::{HermezError, Result};

/// Who owns an account: an Ethereum address or a BJJ display address
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccountOwner {
    Eth(EthAddress),
    Bjj(HezBjjAddress),
}

impl AccountOwner {
    /// Query parameter for `GET /v1/accounts`
    pub fn query_param(&self) -> (&'static str, String) {
        match self {
            AccountOwner::Eth(addr) => ("hezEthereumAddress", addr.to_hez()),
            AccountOwner::Bjj(addr) => ("BJJ", addr.to_string()),
        }
    }
}

impl FromStr for AccountOwner {
    type Err = HermezError;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(addr) = s.parse::<EthAddress>() {
            return Ok(AccountOwner::Eth(addr));
        }
        match s.parse::<HezBjjAddress>() {
            Ok(addr) => Ok(AccountOwner::Bjj(addr)),
            Err(e @ HermezError::ChecksumMismatch { .. }) => Err(e),
            Err(_) => Err(HermezError::InvalidAddress(s.to_string())),
        }
    }
}

impl fmt::Display for AccountOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountOwner::Eth(addr) => f.write_str(&addr.to_hez()),
            AccountOwner::Bjj(addr) => fmt::Display::fmt(addr, f),
        }
    }
}

/// Source of account snapshots. Each call is one query; callers own retries.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    async fn accounts(&self, owner: &AccountOwner) -> Result<Vec<Account>>;
}

/// The parts of an account a transfer needs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub idx: u64,
    pub nonce: u64,
    pub token_id: u32,
    pub token_symbol: String,
}

/// First account whose token symbol matches, ignoring case.
pub fn find_token_account(accounts: &[Account], token_symbol: &str) -> Result<Option<ResolvedAccount>> {
    let account = match accounts
        .iter()
        .find(|a| a.token.symbol.eq_ignore_ascii_case(token_symbol))
    {
        Some(a) => a,
        None => return Ok(None),
    };
    let index: AccountIndex = account.account_index.parse()?;
    Ok(Some(ResolvedAccount {
        idx: index.idx,
        nonce: account.nonce,
        token_id: account.token.id,
        token_symbol: account.token.symbol.clone(),
    }))
}
