use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::account::AccountOwner;
use crate::address::HezBjjAddress;
use crate::crypto::EthAddress;
use crate::encoding::{be_bytes, CanonicalSerialize, Float40};
use crate::error::{HermezError, Result};

/// Leading byte of an L2 (pool) transaction id
const TX_ID_PREFIX_L2: u8 = 0x02;

/// Index into the coordinator's fee table, not a literal fee
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeSelector(pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    Transfer,
}

fn parse_hex_exact<const N: usize>(s: &str) -> Result<[u8; N]> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(body).map_err(|e| HermezError::InvalidHex(format!("{}: {}", s, e)))?;
    bytes
        .try_into()
        .map_err(|_| HermezError::InvalidHex(format!("{}: expected {} bytes", s, N)))
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(pub [u8; 33]);

impl TxId {
    /// `0x02 || sha256(fromIdx[6] || tokenId[4] || amountF40[5] || nonce[5] || fee[1])`
    pub fn for_l2(from_idx: u64, token_id: u32, amount: u128, nonce: u64, fee: FeeSelector) -> Result<Self> {
        let mut preimage = Vec::with_capacity(21);
        preimage.extend_from_slice(&be_bytes::<6>(from_idx, "fromIdx")?);
        preimage.extend_from_slice(&token_id.to_be_bytes());
        Float40::from_amount(amount)?.canonical_serialize(&mut preimage);
        preimage.extend_from_slice(&be_bytes::<5>(nonce, "nonce")?);
        preimage.push(fee.0);

        let mut id = [0u8; 33];
        id[0] = TX_ID_PREFIX_L2;
        id[1..].copy_from_slice(&Sha256::digest(&preimage));
        Ok(TxId(id))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self)
    }
}

impl FromStr for TxId {
    type Err = HermezError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(TxId(parse_hex_exact::<33>(s)?))
    }
}

/// keccak256 over the member transaction ids, in group order
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomicGroupId(pub [u8; 32]);

impl fmt::Display for AtomicGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AtomicGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AtomicGroupId({})", self)
    }
}

impl FromStr for AtomicGroupId {
    type Err = HermezError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(AtomicGroupId(parse_hex_exact::<32>(s)?))
    }
}

macro_rules! hex_string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_string_serde!(TxId);
hex_string_serde!(AtomicGroupId);

/// Snapshot of the sibling a transaction commits to (the `Rq*` block)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestFields {
    pub from_idx: u64,
    pub to_idx: u64,
    pub to_eth_addr: Option<EthAddress>,
    pub to_bjj: Option<HezBjjAddress>,
    pub token_id: u32,
    pub token_symbol: String,
    pub amount: u128,
    pub fee: FeeSelector,
    pub nonce: u64,
}

impl From<&PoolL2Tx> for RequestFields {
    fn from(tx: &PoolL2Tx) -> Self {
        RequestFields {
            from_idx: tx.from_idx,
            to_idx: tx.to_idx,
            to_eth_addr: tx.to_eth_addr,
            to_bjj: tx.to_bjj.clone(),
            token_id: tx.token_id,
            token_symbol: tx.token_symbol.clone(),
            amount: tx.amount,
            fee: tx.fee,
            nonce: tx.nonce,
        }
    }
}

/// A resolved L2 transfer as it sits in the coordinator's pool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolL2Tx {
    pub id: TxId,
    pub tx_type: TxType,
    pub from_idx: u64,
    /// Sender's BJJ key in native byte order; only this key may sign the transaction
    pub from_bjj: [u8; 32],
    pub to_idx: u64,
    pub to_eth_addr: Option<EthAddress>,
    pub to_bjj: Option<HezBjjAddress>,
    pub token_id: u32,
    pub token_symbol: String,
    pub amount: u128,
    pub fee: FeeSelector,
    pub nonce: u64,
    pub rq: Option<RequestFields>,
    pub rq_offset: u8,
    pub atomic_group_id: Option<AtomicGroupId>,
    pub signature: Option<[u8; 64]>,
}

impl PoolL2Tx {
    /// Transfer between two existing accounts. Fails if the amount has no exact Float40 form.
    #[allow(clippy::too_many_arguments)]
    pub fn transfer(
        from_idx: u64,
        from_bjj: [u8; 32],
        to_idx: u64,
        recipient: &AccountOwner,
        token_id: u32,
        token_symbol: &str,
        amount: u128,
        fee: FeeSelector,
        nonce: u64,
    ) -> Result<Self> {
        let id = TxId::for_l2(from_idx, token_id, amount, nonce, fee)?;
        let (to_eth_addr, to_bjj) = match recipient {
            AccountOwner::Eth(addr) => (Some(*addr), None),
            AccountOwner::Bjj(addr) => (None, Some(addr.clone())),
        };
        Ok(PoolL2Tx {
            id,
            tx_type: TxType::Transfer,
            from_idx,
            from_bjj,
            to_idx,
            to_eth_addr,
            to_bjj,
            token_id,
            token_symbol: token_symbol.to_string(),
            amount,
            fee,
            nonce,
            rq: None,
            rq_offset: 0,
            atomic_group_id: None,
            signature: None,
        })
    }
}

fn serialize_recipient(to_eth_addr: &Option<EthAddress>, to_bjj: &Option<HezBjjAddress>, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&to_eth_addr.map(|a| a.0).unwrap_or([0u8; 20]));
    let bjj = to_bjj.as_ref().and_then(|a| a.decode().ok()).unwrap_or([0u8; 32]);
    buf.extend_from_slice(&bjj);
}

impl CanonicalSerialize for RequestFields {
    fn canonical_serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.from_idx.to_be_bytes());
        buf.extend_from_slice(&self.to_idx.to_be_bytes());
        serialize_recipient(&self.to_eth_addr, &self.to_bjj, buf);
        buf.extend_from_slice(&self.token_id.to_be_bytes());
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.push(self.fee.0);
        buf.extend_from_slice(&self.nonce.to_be_bytes());
    }
}

/// Every signed field; the group id and the signature itself are left out.
impl CanonicalSerialize for PoolL2Tx {
    fn canonical_serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.id.0);
        buf.extend_from_slice(&self.from_idx.to_be_bytes());
        buf.extend_from_slice(&self.to_idx.to_be_bytes());
        serialize_recipient(&self.to_eth_addr, &self.to_bjj, buf);
        buf.extend_from_slice(&self.token_id.to_be_bytes());
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.push(self.fee.0);
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.push(self.rq_offset);
        match &self.rq {
            Some(rq) => {
                buf.push(1);
                rq.canonical_serialize(buf);
            }
            None => buf.push(0),
        }
    }
}
