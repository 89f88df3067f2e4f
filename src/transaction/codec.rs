use num_bigint::BigInt;

use super::types::PoolL2Tx;
use crate::error::Result;

/// Canonical hash-to-sign of a pool transaction, supplied by the rollup's
/// transaction codec. Must commit to every field including the `Rq*` block
/// and the chain id, and must return a value below the BJJ subgroup order.
pub trait TxCodec: Send + Sync {
    fn hash_to_sign(&self, tx: &PoolL2Tx, chain_id: u16) -> Result<BigInt>;
}
