//! L2 pool transactions and atomic groups

pub mod atomic;
pub mod codec;
pub mod transfer;
pub mod types;
pub mod wire;

pub use atomic::{link_target, AtomicGroup, AtomicGroupBuilder, TransferIntent};
pub use codec::TxCodec;
pub use transfer::{resolve_transfer, sign_transfer};
pub use types::{AtomicGroupId, FeeSelector, PoolL2Tx, RequestFields, TxId, TxType};
pub use wire::{AtomicGroupRequest, PoolTxApi, PoolTxRequest, TransactionsApiResponse};
