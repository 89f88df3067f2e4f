//! Atomic groups: transfers that the coordinator forges all together or not at all.
//!
//! Pipeline: resolve every intent against the account lookup, link each
//! transaction to the sibling named by its request offset, derive the group
//! id, then sign each transaction with its own sender's BJJ key.

use tracing::{debug, info};

use super::codec::TxCodec;
use super::transfer::{check_signer, resolve_transfer};
use super::types::{AtomicGroupId, FeeSelector, PoolL2Tx, RequestFields, TxId};
use crate::account::{AccountLookup, AccountOwner};
use crate::crypto::keccak256;
use crate::error::{HermezError, Result};
use crate::identity::{BjjKeyPair, BjjWallet};

/// One caller-supplied transfer, before any account resolution
#[derive(Clone, Debug)]
pub struct TransferIntent<'a> {
    pub sender: &'a BjjWallet,
    pub recipient: AccountOwner,
    pub token_symbol: String,
    pub amount: u128,
    pub fee_selector: FeeSelector,
    /// 1..=3 point forward, 4..=7 point backward
    pub rq_offset: u8,
}

/// Position of the sibling that the transaction at `position` commits to.
pub fn link_target(position: usize, offset: u8, len: usize) -> Result<usize> {
    let target = match offset {
        1..=3 => position as i64 + offset as i64,
        4..=7 => position as i64 - (8 - offset as i64),
        _ => return Err(HermezError::InvalidLinkOffset { position, offset }),
    };
    if target < 0 || target >= len as i64 {
        return Err(HermezError::LinkTargetOutOfRange {
            position,
            offset,
            target,
            len,
        });
    }
    Ok(target as usize)
}

#[derive(Clone, Debug)]
pub struct AtomicGroup {
    id: Option<AtomicGroupId>,
    txs: Vec<PoolL2Tx>,
}

impl AtomicGroup {
    pub fn id(&self) -> Option<AtomicGroupId> {
        self.id
    }

    /// In protocol order. There is no mutable access: position is part of the group.
    pub fn transactions(&self) -> &[PoolL2Tx] {
        &self.txs
    }

    pub fn tx_ids(&self) -> Vec<TxId> {
        self.txs.iter().map(|tx| tx.id).collect()
    }

    pub fn is_signed(&self) -> bool {
        !self.txs.is_empty() && self.txs.iter().all(|tx| tx.signature.is_some())
    }

    /// Assign the group id and stamp it on every member.
    pub fn identify(mut self) -> Self {
        let mut ids = Vec::with_capacity(self.txs.len() * 33);
        for tx in &self.txs {
            ids.extend_from_slice(&tx.id.0);
        }
        let id = AtomicGroupId(keccak256(&ids));
        for tx in self.txs.iter_mut() {
            tx.atomic_group_id = Some(id);
        }
        self.id = Some(id);
        info!("Atomic group {} identified ({} txs)", id, self.txs.len());
        self
    }

    /// `keys[i]` must be the BJJ key of the sender of transaction `i`.
    /// Any failure discards the whole group; no partially signed group is returned.
    pub fn sign(mut self, keys: &[&BjjKeyPair], codec: &dyn TxCodec, chain_id: u16) -> Result<Self> {
        let id = self.id.ok_or(HermezError::GroupNotIdentified)?;
        if keys.len() != self.txs.len() {
            return Err(HermezError::SignerCountMismatch {
                expected: self.txs.len(),
                found: keys.len(),
            });
        }
        // every key is checked before the first signature is produced
        for (position, (tx, key)) in self.txs.iter().zip(keys).enumerate() {
            check_signer(position, tx, key)?;
        }
        for (tx, key) in self.txs.iter_mut().zip(keys) {
            let hash = codec.hash_to_sign(tx, chain_id)?;
            tx.signature = Some(key.sign(&hash)?);
            debug!("Signed {} in group {}", tx.id, id);
        }
        info!("Atomic group {} signed for chain {}", id, chain_id);
        Ok(self)
    }
}

/// Builds unsigned, unidentified groups from transfer intents
pub struct AtomicGroupBuilder<'a> {
    lookup: &'a dyn AccountLookup,
}

impl<'a> AtomicGroupBuilder<'a> {
    pub fn new(lookup: &'a dyn AccountLookup) -> Self {
        Self { lookup }
    }

    /// Resolve and link. Offsets are checked before any lookup happens, and
    /// any failure aborts the whole group.
    pub async fn build(&self, intents: &[TransferIntent<'_>]) -> Result<AtomicGroup> {
        if intents.is_empty() {
            return Err(HermezError::EmptyGroup);
        }
        let targets = intents
            .iter()
            .enumerate()
            .map(|(i, intent)| link_target(i, intent.rq_offset, intents.len()))
            .collect::<Result<Vec<_>>>()?;

        let mut txs = Vec::with_capacity(intents.len());
        for intent in intents {
            txs.push(self.resolve(intent).await?);
        }

        // snapshot every sibling before writing any Rq block
        let snapshots: Vec<RequestFields> = targets.iter().map(|&j| RequestFields::from(&txs[j])).collect();
        for ((tx, rq), intent) in txs.iter_mut().zip(snapshots).zip(intents) {
            tx.rq = Some(rq);
            tx.rq_offset = intent.rq_offset;
        }
        for (i, j) in targets.iter().enumerate() {
            debug!("Linked tx {} -> tx {}", i, j);
        }

        Ok(AtomicGroup { id: None, txs })
    }

    async fn resolve(&self, intent: &TransferIntent<'_>) -> Result<PoolL2Tx> {
        resolve_transfer(
            self.lookup,
            intent.sender,
            &intent.recipient,
            &intent.token_symbol,
            intent.amount,
            intent.fee_selector,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::verify_signature;
    use crate::test_utils::{wallet, InMemoryLookup, KeccakCodec};
    use assert_matches::assert_matches;

    const CHAIN_ID: u16 = 5;

    fn intent<'a>(sender: &'a BjjWallet, recipient: &BjjWallet, amount: u128, rq_offset: u8) -> TransferIntent<'a> {
        TransferIntent {
            sender,
            recipient: AccountOwner::Eth(recipient.eth_address),
            token_symbol: "HEZ".to_string(),
            amount,
            fee_selector: FeeSelector(126),
            rq_offset,
        }
    }

    fn lookup(a: &BjjWallet, b: &BjjWallet) -> InMemoryLookup {
        InMemoryLookup::new()
            .with_account(AccountOwner::Eth(a.eth_address), "hez:HEZ:256", "HEZ", 1, 0)
            .with_account(AccountOwner::Eth(b.eth_address), "hez:HEZ:257", "HEZ", 1, 2)
    }

    #[test]
    fn test_link_target() {
        assert_eq!(link_target(0, 1, 2).unwrap(), 1);
        assert_eq!(link_target(1, 7, 2).unwrap(), 0);
        assert_eq!(link_target(0, 3, 4).unwrap(), 3);
        assert_eq!(link_target(4, 4, 5).unwrap(), 0);
        assert_eq!(link_target(3, 5, 5).unwrap(), 0);
        assert_eq!(link_target(2, 6, 3).unwrap(), 0);

        assert_matches!(link_target(0, 0, 2), Err(HermezError::InvalidLinkOffset { position: 0, offset: 0 }));
        assert_matches!(link_target(0, 8, 2), Err(HermezError::InvalidLinkOffset { offset: 8, .. }));
        assert_matches!(
            link_target(0, 3, 2),
            Err(HermezError::LinkTargetOutOfRange { target: 3, len: 2, .. })
        );
        assert_matches!(
            link_target(1, 4, 5),
            Err(HermezError::LinkTargetOutOfRange { target: -3, .. })
        );
    }

    #[tokio::test]
    async fn test_linking_symmetry() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = lookup(&a, &b);
        let group = AtomicGroupBuilder::new(&lookup)
            .build(&[intent(&a, &b, 10, 1), intent(&b, &a, 5, 7)])
            .await
            .unwrap();

        let txs = group.transactions();
        assert_eq!(txs[0].rq.as_ref().unwrap(), &RequestFields::from(&txs[1]));
        assert_eq!(txs[1].rq.as_ref().unwrap(), &RequestFields::from(&txs[0]));
        assert_eq!(txs[0].rq_offset, 1);
        assert_eq!(txs[1].rq_offset, 7);
        assert!(group.id().is_none());
    }

    #[tokio::test]
    async fn test_zero_offset_fails_before_resolution() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = lookup(&a, &b);
        let result = AtomicGroupBuilder::new(&lookup)
            .build(&[intent(&a, &b, 10, 1), intent(&b, &a, 5, 0)])
            .await;
        assert_matches!(result, Err(HermezError::InvalidLinkOffset { position: 1, offset: 0 }));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_offset() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = lookup(&a, &b);
        let result = AtomicGroupBuilder::new(&lookup)
            .build(&[intent(&a, &b, 10, 3), intent(&b, &a, 5, 7)])
            .await;
        assert_matches!(
            result,
            Err(HermezError::LinkTargetOutOfRange { position: 0, offset: 3, target: 3, len: 2 })
        );
    }

    #[tokio::test]
    async fn test_empty_group() {
        let lookup = InMemoryLookup::new();
        let result = AtomicGroupBuilder::new(&lookup).build(&[]).await;
        assert_matches!(result, Err(HermezError::EmptyGroup));
    }

    #[tokio::test]
    async fn test_end_to_end_two_party_swap() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = lookup(&a, &b);
        let codec = KeccakCodec;

        let group = AtomicGroupBuilder::new(&lookup)
            .build(&[intent(&a, &b, 10, 1), intent(&b, &a, 5, 7)])
            .await
            .unwrap()
            .identify()
            .sign(&[&a.keypair, &b.keypair], &codec, CHAIN_ID)
            .unwrap();

        let id = group.id().unwrap();
        let txs = group.transactions();
        assert!(txs.iter().all(|tx| tx.atomic_group_id == Some(id)));
        assert!(group.is_signed());

        assert_eq!(txs[0].rq.as_ref().unwrap().amount, 5);
        assert_eq!(txs[1].rq.as_ref().unwrap().amount, 10);
        assert_eq!((txs[0].from_idx, txs[0].to_idx), (256, 257));
        assert_eq!((txs[1].from_idx, txs[1].to_idx), (257, 256));
        assert_eq!(
            txs[0].id.to_string(),
            "0x02b03d2cfaad0c448895ec852a325bf725447364310faed0265b4ae01525f70ffb"
        );

        // nonces are the snapshot values
        assert_eq!(txs[0].nonce, 0);
        assert_eq!(txs[1].nonce, 2);
        assert_eq!(txs[0].rq.as_ref().unwrap().nonce, 2);

        for (tx, owner) in txs.iter().zip([&a, &b]) {
            let hash = codec.hash_to_sign(tx, CHAIN_ID).unwrap();
            let sig = tx.signature.unwrap();
            assert!(verify_signature(&owner.keypair.public_key_native(), &hash, &sig));
        }
        let hash0 = codec.hash_to_sign(&txs[0], CHAIN_ID).unwrap();
        assert!(!verify_signature(&b.keypair.public_key_native(), &hash0, &txs[0].signature.unwrap()));
    }

    #[tokio::test]
    async fn test_group_id_depends_on_order() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = lookup(&a, &b);
        let builder = AtomicGroupBuilder::new(&lookup);

        let forward = builder
            .build(&[intent(&a, &b, 10, 1), intent(&b, &a, 5, 7)])
            .await
            .unwrap()
            .identify();
        let again = builder
            .build(&[intent(&a, &b, 10, 1), intent(&b, &a, 5, 7)])
            .await
            .unwrap()
            .identify();
        let reversed = builder
            .build(&[intent(&b, &a, 5, 1), intent(&a, &b, 10, 7)])
            .await
            .unwrap()
            .identify();

        assert_eq!(forward.id(), again.id());
        assert_ne!(forward.id(), reversed.id());
    }

    #[tokio::test]
    async fn test_sign_preconditions() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = lookup(&a, &b);
        let builder = AtomicGroupBuilder::new(&lookup);
        let intents = [intent(&a, &b, 10, 1), intent(&b, &a, 5, 7)];

        let unidentified = builder.build(&intents).await.unwrap();
        assert_matches!(
            unidentified.sign(&[&a.keypair, &b.keypair], &KeccakCodec, CHAIN_ID),
            Err(HermezError::GroupNotIdentified)
        );

        let identified = builder.build(&intents).await.unwrap().identify();
        assert_matches!(
            identified.sign(&[&a.keypair], &KeccakCodec, CHAIN_ID),
            Err(HermezError::SignerCountMismatch { expected: 2, found: 1 })
        );
    }

    #[tokio::test]
    async fn test_sign_rejects_keys_in_wrong_order() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = lookup(&a, &b);
        let group = AtomicGroupBuilder::new(&lookup)
            .build(&[intent(&a, &b, 10, 1), intent(&b, &a, 5, 7)])
            .await
            .unwrap()
            .identify();
        let first_id = group.transactions()[0].id.to_string();

        assert_eq!(group.transactions()[0].from_bjj, a.keypair.public_key_native());
        assert_eq!(group.transactions()[1].from_bjj, b.keypair.public_key_native());
        assert_matches!(
            group.clone().sign(&[&b.keypair, &a.keypair], &KeccakCodec, CHAIN_ID),
            Err(HermezError::SignerKeyMismatch { position: 0, tx_id }) if tx_id == first_id
        );
        assert_matches!(
            group.sign(&[&a.keypair, &a.keypair], &KeccakCodec, CHAIN_ID),
            Err(HermezError::SignerKeyMismatch { position: 1, .. })
        );
    }

    #[tokio::test]
    async fn test_bjj_recipient() {
        let (a, b) = (wallet(1), wallet(2));
        let to_b = AccountOwner::Bjj(b.hez_bjj_address.clone());
        let lookup = lookup(&a, &b).with_account(to_b.clone(), "hez:HEZ:257", "HEZ", 1, 2);

        let mut pay_b = intent(&a, &b, 10, 1);
        pay_b.recipient = to_b;
        let group = AtomicGroupBuilder::new(&lookup)
            .build(&[pay_b, intent(&b, &a, 5, 7)])
            .await
            .unwrap();

        let txs = group.transactions();
        assert_eq!(txs[0].to_idx, 257);
        assert_eq!(txs[0].to_bjj.as_ref(), Some(&b.hez_bjj_address));
        assert!(txs[0].to_eth_addr.is_none());

        let rq = txs[1].rq.as_ref().unwrap();
        assert_eq!(rq.to_bjj.as_ref(), Some(&b.hez_bjj_address));
        assert!(rq.to_eth_addr.is_none());
        assert_eq!(txs[1].to_eth_addr, Some(a.eth_address));
    }

    #[tokio::test]
    async fn test_resolution_failures() {
        let (a, b, c) = (wallet(1), wallet(2), wallet(3));
        let lookup = lookup(&a, &b).with_account(AccountOwner::Eth(c.eth_address), "HEZ:258", "HEZ", 1, 0);
        let builder = AtomicGroupBuilder::new(&lookup);

        let mut wrong_token = intent(&a, &b, 10, 1);
        wrong_token.token_symbol = "DAI".to_string();
        assert_matches!(
            builder.build(&[wrong_token, intent(&b, &a, 5, 7)]).await,
            Err(HermezError::NoAccountForToken { token, .. }) if token == "DAI"
        );

        let stranger = wallet(4);
        assert_matches!(
            builder.build(&[intent(&a, &stranger, 10, 1), intent(&b, &a, 5, 7)]).await,
            Err(HermezError::RecipientAccountNotFound { .. })
        );

        assert_matches!(
            builder.build(&[intent(&c, &a, 10, 1), intent(&a, &c, 5, 7)]).await,
            Err(HermezError::MalformedAccountIndex(_))
        );

        assert_matches!(
            builder.build(&[intent(&a, &b, (1 << 35) + 1, 1), intent(&b, &a, 5, 7)]).await,
            Err(HermezError::AmountNotRepresentable(_))
        );
    }

    #[tokio::test]
    async fn test_lowercase_symbol_resolves() {
        let (a, b) = (wallet(1), wallet(2));
        let lookup = lookup(&a, &b);
        let mut first = intent(&a, &b, 10, 1);
        first.token_symbol = "hez".to_string();
        let group = AtomicGroupBuilder::new(&lookup)
            .build(&[first, intent(&b, &a, 5, 7)])
            .await
            .unwrap();
        assert_eq!(group.transactions()[0].token_symbol, "HEZ");
        assert_eq!(group.transactions()[0].token_id, 1);
    }
}
