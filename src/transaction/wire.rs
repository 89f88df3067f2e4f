//! Coordinator JSON: request bodies for the atomic and plain pools, and
//! the records `GET /v1/transactions-pool` returns.

use serde::{Deserialize, Serialize};

use super::atomic::AtomicGroup;
use super::types::{AtomicGroupId, FeeSelector, PoolL2Tx, TxId, TxType};
use crate::account::Token;
use crate::address::{AccountIndex, HezBjjAddress};
use crate::error::{HermezError, Result};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolTxRequest {
    pub id: TxId,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub token_id: u32,
    pub from_account_index: String,
    pub to_account_index: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_hez_ethereum_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_bjj: Option<HezBjjAddress>,
    /// decimal string, amounts exceed JSON number precision
    pub amount: String,
    pub fee: FeeSelector,
    pub nonce: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_from_account_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_to_account_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_to_hez_ethereum_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_to_bjj: Option<HezBjjAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_token_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_fee: Option<FeeSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_nonce: Option<u64>,
}

impl From<&PoolL2Tx> for PoolTxRequest {
    fn from(tx: &PoolL2Tx) -> Self {
        let index = |idx: u64, symbol: &str| AccountIndex::new(symbol, idx).to_string();
        let rq = tx.rq.as_ref();
        PoolTxRequest {
            id: tx.id,
            tx_type: tx.tx_type,
            token_id: tx.token_id,
            from_account_index: index(tx.from_idx, &tx.token_symbol),
            to_account_index: index(tx.to_idx, &tx.token_symbol),
            to_hez_ethereum_address: tx.to_eth_addr.map(|a| a.to_hez()),
            to_bjj: tx.to_bjj.clone(),
            amount: tx.amount.to_string(),
            fee: tx.fee,
            nonce: tx.nonce,
            signature: tx.signature.map(hex::encode),
            request_from_account_index: rq.map(|r| index(r.from_idx, &r.token_symbol)),
            request_to_account_index: rq.map(|r| index(r.to_idx, &r.token_symbol)),
            request_to_hez_ethereum_address: rq.and_then(|r| r.to_eth_addr).map(|a| a.to_hez()),
            request_to_bjj: rq.and_then(|r| r.to_bjj.clone()),
            request_token_id: rq.map(|r| r.token_id),
            request_amount: rq.map(|r| r.amount.to_string()),
            request_fee: rq.map(|r| r.fee),
            request_nonce: rq.map(|r| r.nonce),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AtomicGroupRequest {
    pub atomic_group_id: AtomicGroupId,
    pub transactions: Vec<PoolTxRequest>,
}

impl TryFrom<&AtomicGroup> for AtomicGroupRequest {
    type Error = HermezError;

    fn try_from(group: &AtomicGroup) -> Result<Self> {
        let atomic_group_id = group.id().ok_or(HermezError::GroupNotIdentified)?;
        Ok(AtomicGroupRequest {
            atomic_group_id,
            transactions: group.transactions().iter().map(PoolTxRequest::from).collect(),
        })
    }
}

/// A pool transaction as the coordinator reports it. The coordinator knows
/// more transaction types than this crate builds, so `type` stays a string.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolTxApi {
    #[serde(default)]
    pub item_id: u64,
    pub id: TxId,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub from_account_index: String,
    #[serde(default)]
    pub from_hez_ethereum_address: Option<String>,
    #[serde(rename = "fromBJJ", default)]
    pub from_bjj: Option<String>,
    #[serde(default)]
    pub to_account_index: Option<String>,
    #[serde(default)]
    pub to_hez_ethereum_address: Option<String>,
    #[serde(rename = "toBJJ", default)]
    pub to_bjj: Option<String>,
    pub amount: String,
    pub fee: FeeSelector,
    pub nonce: u64,
    /// `pend`, `fing`, `fged` or `invl`
    pub state: String,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub request_from_account_index: Option<String>,
    #[serde(default)]
    pub request_amount: Option<String>,
    #[serde(default)]
    pub request_nonce: Option<u64>,
    pub token: Token,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsApiResponse {
    pub transactions: Vec<PoolTxApi>,
    #[serde(default)]
    pub pending_items: u64,
}

impl PoolTxApi {
    pub fn is_forged(&self) -> bool {
        self.state == "fged"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountOwner;
    use crate::test_utils::{wallet, InMemoryLookup, KeccakCodec};
    use crate::transaction::{AtomicGroupBuilder, TransferIntent};
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_wire_form_of_signed_group() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = InMemoryLookup::new()
            .with_account(AccountOwner::Eth(a.eth_address), "hez:HEZ:256", "HEZ", 1, 0)
            .with_account(AccountOwner::Eth(b.eth_address), "hez:HEZ:257", "HEZ", 1, 2);
        let intents = [
            TransferIntent {
                sender: &a,
                recipient: AccountOwner::Eth(b.eth_address),
                token_symbol: "HEZ".to_string(),
                amount: 10,
                fee_selector: FeeSelector(126),
                rq_offset: 1,
            },
            TransferIntent {
                sender: &b,
                recipient: AccountOwner::Eth(a.eth_address),
                token_symbol: "HEZ".to_string(),
                amount: 5,
                fee_selector: FeeSelector(126),
                rq_offset: 7,
            },
        ];

        let unidentified = AtomicGroupBuilder::new(&lookup).build(&intents).await.unwrap();
        assert_matches!(
            AtomicGroupRequest::try_from(&unidentified),
            Err(HermezError::GroupNotIdentified)
        );

        let group = unidentified
            .identify()
            .sign(&[&a.keypair, &b.keypair], &KeccakCodec, 5)
            .unwrap();
        let request = AtomicGroupRequest::try_from(&group).unwrap();
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["atomicGroupId"], group.id().unwrap().to_string());
        let tx0 = &json["transactions"][0];
        assert_eq!(tx0["type"], "Transfer");
        assert_eq!(tx0["fromAccountIndex"], "hez:HEZ:256");
        assert_eq!(tx0["toAccountIndex"], "hez:HEZ:257");
        assert_eq!(tx0["toHezEthereumAddress"], b.hez_eth_address());
        assert_eq!(tx0["amount"], "10");
        assert_eq!(tx0["fee"], 126);
        assert_eq!(tx0["requestFromAccountIndex"], "hez:HEZ:257");
        assert_eq!(tx0["requestAmount"], "5");
        assert_eq!(tx0["requestNonce"], 2);
        assert_eq!(tx0["signature"].as_str().unwrap().len(), 128);
        assert!(tx0.get("toBjj").is_none());

        let back: AtomicGroupRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_parse_pool_transactions() {
        let body = r#"{
            "transactions": [{
                "itemId": 7,
                "id": "0x02b03d2cfaad0c448895ec852a325bf725447364310faed0265b4ae01525f70ffb",
                "type": "Transfer",
                "fromAccountIndex": "hez:HEZ:256",
                "fromHezEthereumAddress": "hez:0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf",
                "fromBJJ": "hez:AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh_w",
                "toAccountIndex": "hez:HEZ:257",
                "toHezEthereumAddress": null,
                "toBJJ": null,
                "amount": "10",
                "fee": 126,
                "nonce": 0,
                "state": "pend",
                "maxNumBatch": 0,
                "info": null,
                "errorCode": null,
                "errorType": null,
                "signature": "aa",
                "timestamp": "2021-11-05T12:00:00Z",
                "requestFromAccountIndex": "hez:HEZ:257",
                "requestAmount": "5",
                "requestNonce": 2,
                "token": {"id": 1, "symbol": "HEZ", "decimals": 18}
            }],
            "pendingItems": 0
        }"#;
        let response: TransactionsApiResponse = serde_json::from_str(body).unwrap();
        let tx = &response.transactions[0];
        assert_eq!(tx.id, TxId::for_l2(256, 1, 10, 0, FeeSelector(126)).unwrap());
        assert_eq!(tx.fee, FeeSelector(126));
        assert_eq!(tx.token.symbol, "HEZ");
        assert_eq!(tx.request_amount.as_deref(), Some("5"));
        assert!(tx.to_bjj.is_none());
        assert!(!tx.is_forged());
    }
}
