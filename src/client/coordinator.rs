// HTTP client for a Hermez coordinator's REST API
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::account::{Account, AccountApiResponse, AccountLookup, AccountOwner, Token, TokensApiResponse};
use crate::auth::AccountCreationRequest;
use crate::config::ClientConfig;
use crate::error::{HermezError, Result};
use crate::transaction::{
    AtomicGroup, AtomicGroupRequest, PoolL2Tx, PoolTxApi, PoolTxRequest, TransactionsApiResponse, TxId,
};

/// Status of one coordinator call, decoded once at the boundary
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorResponse<T> {
    Ok(T),
    CoordinatorError { status: u16, body: String },
}

impl<T: DeserializeOwned> CoordinatorResponse<T> {
    /// An empty 2xx body decodes as JSON `null`.
    pub fn from_parts(status: u16, body: &str) -> Result<Self> {
        if !(200..300).contains(&status) {
            return Ok(CoordinatorResponse::CoordinatorError {
                status,
                body: body.to_string(),
            });
        }
        let body = if body.trim().is_empty() { "null" } else { body };
        Ok(CoordinatorResponse::Ok(serde_json::from_str(body)?))
    }
}

impl<T> CoordinatorResponse<T> {
    pub fn into_result(self) -> Result<T> {
        match self {
            CoordinatorResponse::Ok(value) => Ok(value),
            CoordinatorResponse::CoordinatorError { status, body } => {
                Err(HermezError::Coordinator { status, body })
            }
        }
    }
}

/// `Ok(true)` when every transaction is forged, `Ok(false)` when none is.
/// A partial result means the coordinator broke atomicity.
pub fn group_forged(forged: usize, total: usize) -> Result<bool> {
    if forged == total {
        Ok(true)
    } else if forged == 0 {
        Ok(false)
    } else {
        Err(HermezError::PartiallyForged { forged, total })
    }
}

pub struct CoordinatorClient {
    url: String,
    client: Client,
}

impl CoordinatorClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            &config.coordinator_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<CoordinatorResponse<T>> {
        let url = format!("{}{}", self.url, path);
        debug!("GET {}", url);
        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        CoordinatorResponse::from_parts(status, &body)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<CoordinatorResponse<T>> {
        let url = format!("{}{}", self.url, path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        CoordinatorResponse::from_parts(status, &text)
    }

    /// Accounts owned by `owner`. The coordinator answers 404 when there are none.
    pub async fn get_accounts(&self, owner: &AccountOwner) -> Result<Vec<Account>> {
        let (key, value) = owner.query_param();
        match self
            .get::<AccountApiResponse>("/v1/accounts", &[(key, value)])
            .await?
        {
            CoordinatorResponse::Ok(response) => Ok(response.accounts),
            CoordinatorResponse::CoordinatorError { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(Vec::new())
            }
            error => error.into_result().map(|r| r.accounts),
        }
    }

    /// Submit a signed, identified group to the atomic pool.
    pub async fn submit_atomic_group(&self, group: &AtomicGroup) -> Result<serde_json::Value> {
        if !group.is_signed() {
            warn!("Refusing to submit an unsigned atomic group");
            return Err(HermezError::SigningFailed("atomic group is not fully signed".to_string()));
        }
        self.submit_atomic_request(&AtomicGroupRequest::try_from(group)?).await
    }

    /// Submit a group already in wire form, e.g. one signed elsewhere.
    pub async fn submit_atomic_request(&self, request: &AtomicGroupRequest) -> Result<serde_json::Value> {
        if request.transactions.is_empty() {
            return Err(HermezError::EmptyGroup);
        }
        if let Some(unsigned) = request.transactions.iter().find(|tx| tx.signature.is_none()) {
            warn!("Refusing to submit atomic group {}: {} is unsigned", request.atomic_group_id, unsigned.id);
            return Err(HermezError::SigningFailed(format!("{} is not signed", unsigned.id)));
        }
        let response = self
            .post::<_, serde_json::Value>("/v1/atomic-pool", request)
            .await?
            .into_result()?;
        info!("Atomic group {} accepted by {}", request.atomic_group_id, self.url);
        Ok(response)
    }

    /// Submit one signed transfer to the plain pool.
    pub async fn submit_transaction(&self, tx: &PoolL2Tx) -> Result<serde_json::Value> {
        self.submit_transaction_request(&PoolTxRequest::from(tx)).await
    }

    pub async fn submit_transaction_request(&self, request: &PoolTxRequest) -> Result<serde_json::Value> {
        if request.signature.is_none() {
            warn!("Refusing to submit unsigned transaction {}", request.id);
            return Err(HermezError::SigningFailed(format!("{} is not signed", request.id)));
        }
        let response = self
            .post::<_, serde_json::Value>("/v1/transactions-pool", request)
            .await?
            .into_result()?;
        info!("Transaction {} accepted by {}", request.id, self.url);
        Ok(response)
    }

    /// Tokens the network supports
    pub async fn get_tokens(&self) -> Result<Vec<Token>> {
        let response = self
            .get::<TokensApiResponse>("/v1/tokens", &[("limit", "100".to_string())])
            .await?
            .into_result()?;
        Ok(response.tokens)
    }

    pub async fn get_pool_transactions(&self) -> Result<Vec<PoolTxApi>> {
        let response = self
            .get::<TransactionsApiResponse>("/v1/transactions-pool", &[("limit", "1000".to_string())])
            .await?
            .into_result()?;
        Ok(response.transactions)
    }

    /// `None` when the coordinator has no such transaction in its pool.
    pub async fn get_pool_transaction(&self, tx_id: &TxId) -> Result<Option<PoolTxApi>> {
        let path = format!("/v1/transactions-pool/{}", tx_id);
        match self.get::<PoolTxApi>(&path, &[]).await? {
            CoordinatorResponse::Ok(tx) => Ok(Some(tx)),
            CoordinatorResponse::CoordinatorError { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            error => error.into_result().map(Some),
        }
    }

    pub async fn submit_account_creation(&self, request: &AccountCreationRequest) -> Result<serde_json::Value> {
        let response = self
            .post::<_, serde_json::Value>("/v1/account-creation-authorization", request)
            .await?
            .into_result()?;
        info!("Account creation authorization stored for {}", request.hez_ethereum_address);
        Ok(response)
    }

    /// One query: 200 means forged, 404 means not yet.
    pub async fn is_forged(&self, tx_id: &TxId) -> Result<bool> {
        let path = format!("/v1/transactions-history/{}", tx_id);
        match self.get::<serde_json::Value>(&path, &[]).await? {
            CoordinatorResponse::Ok(_) => Ok(true),
            CoordinatorResponse::CoordinatorError { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(false)
            }
            error => error.into_result().map(|_| false),
        }
    }

    async fn count_forged(&self, tx_ids: &[TxId]) -> Result<usize> {
        let mut forged = 0;
        for tx_id in tx_ids {
            if self.is_forged(tx_id).await? {
                forged += 1;
            }
        }
        Ok(forged)
    }

    /// Poll until every transaction of the group is forged. The ids are
    /// queried one by one, so a batch forged between two queries reads as
    /// partial; a partial count is re-read once before it is reported.
    pub async fn wait_until_forged(&self, tx_ids: &[TxId], interval: Duration, max_attempts: u32) -> Result<()> {
        if tx_ids.is_empty() {
            return Err(HermezError::EmptyGroup);
        }
        for attempt in 1..=max_attempts {
            let mut forged = self.count_forged(tx_ids).await?;
            if forged > 0 && forged < tx_ids.len() {
                debug!("{}/{} forged, querying the group again", forged, tx_ids.len());
                forged = self.count_forged(tx_ids).await?;
            }
            if group_forged(forged, tx_ids.len())? {
                info!("All {} transactions forged after {} attempt(s)", tx_ids.len(), attempt);
                return Ok(());
            }
            info!("Attempt {}/{}: group not forged yet", attempt, max_attempts);
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(HermezError::Coordinator {
            status: StatusCode::REQUEST_TIMEOUT.as_u16(),
            body: format!("transactions not forged after {} attempts", max_attempts),
        })
    }
}

#[async_trait]
impl AccountLookup for CoordinatorClient {
    async fn accounts(&self, owner: &AccountOwner) -> Result<Vec<Account>> {
        self.get_accounts(owner).await
    }
}
