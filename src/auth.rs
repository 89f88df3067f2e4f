//! Account creation authorization: an EIP-712 signature by the Ethereum key
//! that links it to a BJJ key for one chain id and rollup contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::address::HezBjjAddress;
use crate::crypto::{keccak256, legacy_recovery_byte, recover_address, EthAddress, EthSigner};
use crate::error::{HermezError, Result};

pub const EIP712_PROVIDER: &str = "Hermez Network";
pub const EIP712_VERSION: &str = "1";
pub const ACCOUNT_CREATION_AUTH_MSG: &str = "Account creation";

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const AUTHORISE_TYPE: &str = "Authorise(string Provider,string Authorisation,bytes32 BJJKey)";

/// Chain ids are u16 on the rollup side; anything wider is rejected, never wrapped.
pub fn check_chain_id(chain_id: u64) -> Result<u16> {
    u16::try_from(chain_id).map_err(|_| HermezError::ChainIdOutOfRange(chain_id))
}

fn domain_separator(chain_id: u16, rollup_contract: EthAddress) -> [u8; 32] {
    let mut chain = [0u8; 32];
    chain[30..].copy_from_slice(&chain_id.to_be_bytes());
    let mut contract = [0u8; 32];
    contract[12..].copy_from_slice(&rollup_contract.0);

    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(&keccak256(EIP712_DOMAIN_TYPE.as_bytes()));
    buf.extend_from_slice(&keccak256(EIP712_PROVIDER.as_bytes()));
    buf.extend_from_slice(&keccak256(EIP712_VERSION.as_bytes()));
    buf.extend_from_slice(&chain);
    buf.extend_from_slice(&contract);
    keccak256(&buf)
}

/// EIP-712 digest over the authorization. `bjj` is the native-order
/// compressed key; the typed message carries it byte-reversed.
pub fn hash_to_sign(bjj: &[u8; 32], chain_id: u16, rollup_contract: EthAddress) -> [u8; 32] {
    let mut bjj_key = *bjj;
    bjj_key.reverse();

    let mut message = Vec::with_capacity(32 * 4);
    message.extend_from_slice(&keccak256(AUTHORISE_TYPE.as_bytes()));
    message.extend_from_slice(&keccak256(EIP712_PROVIDER.as_bytes()));
    message.extend_from_slice(&keccak256(ACCOUNT_CREATION_AUTH_MSG.as_bytes()));
    message.extend_from_slice(&bjj_key);

    let mut raw = Vec::with_capacity(2 + 64);
    raw.extend_from_slice(&[0x19, 0x01]);
    raw.extend_from_slice(&domain_separator(chain_id, rollup_contract));
    raw.extend_from_slice(&keccak256(&message));
    keccak256(&raw)
}

#[derive(Clone, Debug)]
pub struct AccountCreationAuth {
    pub eth_addr: EthAddress,
    /// Native-order compressed BJJ key (not swapped)
    pub bjj: [u8; 32],
    /// `r || s || v`, v in 27/28
    pub signature: [u8; 65],
    pub timestamp: DateTime<Utc>,
}

impl AccountCreationAuth {
    pub fn verify_signature(&self, chain_id: u16, rollup_contract: EthAddress) -> bool {
        let digest = hash_to_sign(&self.bjj, chain_id, rollup_contract);
        match recover_address(&digest, &self.signature) {
            Ok(signer) => signer == self.eth_addr,
            Err(_) => false,
        }
    }

    pub fn signature_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signature))
    }
}

/// Sign the authorization through `signer` and check it before handing it out.
pub fn authorize(
    signer: &dyn EthSigner,
    bjj: &[u8; 32],
    chain_id: u64,
    rollup_contract: EthAddress,
) -> Result<AccountCreationAuth> {
    let chain_id = check_chain_id(chain_id)?;
    let digest = hash_to_sign(bjj, chain_id, rollup_contract);

    let mut signature = signer.sign_digest(&digest)?;
    signature[64] = legacy_recovery_byte(signature[64])?;

    let auth = AccountCreationAuth {
        eth_addr: signer.address(),
        bjj: *bjj,
        signature,
        timestamp: Utc::now(),
    };

    if !auth.verify_signature(chain_id, rollup_contract) {
        warn!("Account creation signature self-check failed for {}", auth.eth_addr);
        return Err(HermezError::SignatureSelfCheckFailed(auth.eth_addr.to_string()));
    }

    info!(
        "Account creation authorized for {} on chain {} (rollup {})",
        auth.eth_addr, chain_id, rollup_contract
    );
    Ok(auth)
}

/// Body of `POST /v1/account-creation-authorization`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreationRequest {
    pub hez_ethereum_address: String,
    pub bjj: HezBjjAddress,
    pub signature: String,
}

impl AccountCreationRequest {
    pub fn new(auth: &AccountCreationAuth, bjj: &HezBjjAddress) -> Self {
        Self {
            hez_ethereum_address: auth.eth_addr.to_hez(),
            bjj: bjj.clone(),
            signature: auth.signature_hex(),
        }
    }
}
