//! Test doubles shared by the unit tests

use async_trait::async_trait;
use num_bigint::{BigInt, Sign};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::account::{Account, AccountLookup, AccountOwner, Token};
use crate::crypto::{keccak256, EthKey};
use crate::encoding::CanonicalSerialize;
use crate::error::Result;
use crate::identity::BjjWallet;
use crate::transaction::{PoolL2Tx, TxCodec};

/// Ethereum key whose scalar is `n`
pub fn eth_key(n: u8) -> EthKey {
    let mut bytes = [0u8; 32];
    bytes[31] = n;
    EthKey::from_bytes(&bytes).unwrap()
}

pub fn wallet(n: u8) -> BjjWallet {
    BjjWallet::from_eth_signer(&eth_key(n)).unwrap()
}

/// Account snapshots held in memory; counts every query.
#[derive(Default)]
pub struct InMemoryLookup {
    accounts: HashMap<AccountOwner, Vec<Account>>,
    calls: AtomicUsize,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, owner: AccountOwner, index: &str, symbol: &str, token_id: u32, nonce: u64) -> Self {
        let account = Account {
            account_index: index.to_string(),
            balance: "1000000000000000000".to_string(),
            bjj: String::new(),
            hez_ethereum_address: owner.to_string(),
            item_id: 0,
            nonce,
            token: Token {
                id: token_id,
                symbol: symbol.to_string(),
                name: symbol.to_string(),
                decimals: 18,
                ethereum_address: String::new(),
                usd: None,
            },
        };
        self.accounts.entry(owner).or_default().push(account);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountLookup for InMemoryLookup {
    async fn accounts(&self, owner: &AccountOwner) -> Result<Vec<Account>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.get(owner).cloned().unwrap_or_default())
    }
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Keccak over the signed bytes and chain id, cut to 248 bits so it stays below the subgroup order.
pub struct KeccakCodec;

impl TxCodec for KeccakCodec {
    fn hash_to_sign(&self, tx: &PoolL2Tx, chain_id: u16) -> Result<BigInt> {
        let mut buf = tx.to_bytes();
        buf.extend_from_slice(&chain_id.to_be_bytes());
        let digest = keccak256(&buf);
        Ok(BigInt::from_bytes_be(Sign::Plus, &digest[..31]))
    }
}
