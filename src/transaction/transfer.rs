//! Single L2 transfers, sent to `POST /v1/transactions-pool` outside any atomic group.

use tracing::{debug, info};

use super::codec::TxCodec;
use super::types::{FeeSelector, PoolL2Tx};
use crate::account::{find_token_account, AccountLookup, AccountOwner};
use crate::error::{HermezError, Result};
use crate::identity::{BjjKeyPair, BjjWallet};

/// Look up the sender's and the recipient's accounts for `token_symbol` and
/// build the unsigned transfer between them.
pub async fn resolve_transfer(
    lookup: &dyn AccountLookup,
    sender: &BjjWallet,
    recipient: &AccountOwner,
    token_symbol: &str,
    amount: u128,
    fee: FeeSelector,
) -> Result<PoolL2Tx> {
    let owner = AccountOwner::Eth(sender.eth_address);
    let accounts = lookup.accounts(&owner).await?;
    let from = find_token_account(&accounts, token_symbol)?.ok_or_else(|| HermezError::NoAccountForToken {
        address: owner.to_string(),
        token: token_symbol.to_string(),
    })?;

    let accounts = lookup.accounts(recipient).await?;
    let to = find_token_account(&accounts, token_symbol)?.ok_or_else(|| HermezError::RecipientAccountNotFound {
        address: recipient.to_string(),
        token: token_symbol.to_string(),
    })?;

    debug!(
        "Resolved {} idx {} (nonce {}) -> {} idx {} for {}",
        owner, from.idx, from.nonce, recipient, to.idx, from.token_symbol
    );

    // nonce is taken as reported; the coordinator expects the current value
    PoolL2Tx::transfer(
        from.idx,
        sender.keypair.public_key_native(),
        to.idx,
        recipient,
        from.token_id,
        &from.token_symbol,
        amount,
        fee,
        from.nonce,
    )
}

/// `key` must be the BJJ key the transaction was resolved for.
pub(crate) fn check_signer(position: usize, tx: &PoolL2Tx, key: &BjjKeyPair) -> Result<()> {
    if key.public_key_native() != tx.from_bjj {
        return Err(HermezError::SignerKeyMismatch {
            position,
            tx_id: tx.id.to_string(),
        });
    }
    Ok(())
}

/// Sign a standalone transfer. Transactions that belong to an atomic group
/// are signed through `AtomicGroup::sign` instead.
pub fn sign_transfer(mut tx: PoolL2Tx, key: &BjjKeyPair, codec: &dyn TxCodec, chain_id: u16) -> Result<PoolL2Tx> {
    if tx.atomic_group_id.is_some() || tx.rq.is_some() {
        return Err(HermezError::SigningFailed(format!(
            "{} is linked into an atomic group",
            tx.id
        )));
    }
    check_signer(0, &tx, key)?;
    let hash = codec.hash_to_sign(&tx, chain_id)?;
    tx.signature = Some(key.sign(&hash)?);
    info!("Signed transfer {} for chain {}", tx.id, chain_id);
    Ok(tx)
}
