//! `GET /v1/accounts` and `GET /v1/tokens` response types

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountApiResponse {
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub pending_items: u64,
}

/// One per (owner, token) pair
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// `hez:<SYMBOL>:<idx>`
    pub account_index: String,
    #[serde(default)]
    pub balance: String,
    #[serde(default)]
    pub bjj: String,
    #[serde(default)]
    pub hez_ethereum_address: String,
    #[serde(default)]
    pub item_id: u64,
    pub nonce: u64,
    pub token: Token,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: u32,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default)]
    pub ethereum_address: String,
    #[serde(rename = "USD", default)]
    pub usd: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokensApiResponse {
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub pending_items: u64,
}
