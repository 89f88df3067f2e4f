//! Baby Jubjub identity derived from an Ethereum signature.
//!
//! The Ethereum key signs a fixed, public phrase; the Keccak hash of the hex
//! encoded signature becomes the BJJ private key. The coordinator recomputes
//! the same address from the account record, so every byte here matters.

use babyjubjub_rs::{decompress_point, decompress_signature, PrivateKey};
use bip39::{Language, Mnemonic};
use num_bigint::BigInt;
use std::fmt;
use tiny_hderive::bip32::ExtendedPrivKey;
use tracing::{debug, info};

use crate::address::HezBjjAddress;
use crate::auth::{self, AccountCreationAuth, AccountCreationRequest};
use crate::config::NetworkDefinition;
use crate::crypto::{keccak256, legacy_recovery_byte, personal_message_hash, EthAddress, EthKey, EthSigner};
use crate::error::{HermezError, Result};

pub const HERMEZ_WALLET_MSG: &str =
    "Hermez Network account access.\n\nSign this message if you are in a trusted application only.";

const ETH_DERIVATION_PATH: &str = "m/44'/60'/0'/0/";

/// BJJ wallet material. Immutable once derived.
#[derive(Clone, PartialEq, Eq)]
pub struct BjjKeyPair {
    private_key: [u8; 32],
    public_key_native: [u8; 32],
    public_key_compressed: [u8; 32],
}

impl BjjKeyPair {
    pub fn from_private_key(private_key: [u8; 32]) -> Result<Self> {
        let sk = PrivateKey::import(private_key.to_vec()).map_err(HermezError::DerivationFailed)?;
        let public_key_native = sk.public().compress();
        let mut public_key_compressed = public_key_native;
        public_key_compressed.reverse();
        Ok(BjjKeyPair {
            private_key,
            public_key_native,
            public_key_compressed,
        })
    }

    /// Compressed point exactly as the curve library emits it.
    /// Used for authorization and the display address.
    pub fn public_key_native(&self) -> [u8; 32] {
        self.public_key_native
    }

    /// Byte-reversed compressed point, as the API account record stores it.
    pub fn public_key_compressed(&self) -> [u8; 32] {
        self.public_key_compressed
    }

    pub fn address(&self) -> Result<HezBjjAddress> {
        HezBjjAddress::encode(&self.public_key_native)
    }

    /// Poseidon EdDSA signature, compressed to 64 bytes
    pub fn sign(&self, msg: &BigInt) -> Result<[u8; 64]> {
        let sk = PrivateKey::import(self.private_key.to_vec()).map_err(HermezError::SigningFailed)?;
        let signature = sk.sign(msg.clone()).map_err(HermezError::SigningFailed)?;
        Ok(signature.compress())
    }

    pub fn verify(&self, msg: &BigInt, signature: &[u8; 64]) -> bool {
        verify_signature(&self.public_key_native, msg, signature)
    }
}

impl fmt::Debug for BjjKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BjjKeyPair")
            .field("public_key_compressed", &hex::encode(self.public_key_compressed))
            .finish_non_exhaustive()
    }
}

/// Verify a compressed signature against a native-order compressed key
pub fn verify_signature(public_key_native: &[u8; 32], msg: &BigInt, signature: &[u8; 64]) -> bool {
    let point = match decompress_point(*public_key_native) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let sig = match decompress_signature(signature) {
        Ok(s) => s,
        Err(_) => return false,
    };
    babyjubjub_rs::verify(point, sig, msg.clone())
}

/// Keccak of the `0x`-prefixed lowercase hex of the signature text.
fn seed_from_signature(signature: &[u8; 65]) -> [u8; 32] {
    let encoded = format!("0x{}", hex::encode(signature));
    keccak256(encoded.as_bytes())
}

/// Derive the BJJ keypair from a 65-byte `r || s || v` signature over
/// [`HERMEZ_WALLET_MSG`]. `v` may use either the 0/1 or the 27/28 convention.
pub fn derive_from_signature(signature: &[u8]) -> Result<BjjKeyPair> {
    if signature.len() != 65 {
        return Err(HermezError::InvalidSignature(format!(
            "expected 65 bytes, got {}",
            signature.len()
        )));
    }
    let mut normalized = [0u8; 65];
    normalized.copy_from_slice(signature);
    normalized[64] = legacy_recovery_byte(signature[64])?;

    BjjKeyPair::from_private_key(seed_from_signature(&normalized))
}

/// Ethereum key at `m/44'/60'/0'/0/<index>` of a BIP-39 mnemonic
pub fn eth_key_from_mnemonic(phrase: &str, index: u32) -> Result<EthKey> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| HermezError::DerivationFailed(format!("Invalid mnemonic: {}", e)))?;
    let seed = mnemonic.to_seed("");
    let path = format!("{}{}", ETH_DERIVATION_PATH, index);
    let ext = ExtendedPrivKey::derive(&seed, path.as_str())
        .map_err(|e| HermezError::DerivationFailed(format!("BIP-32 derivation {}: {:?}", path, e)))?;
    EthKey::from_bytes(&ext.secret())
}

/// A BJJ keypair bound to the Ethereum account that produced it
#[derive(Clone, Debug)]
pub struct BjjWallet {
    pub keypair: BjjKeyPair,
    pub hez_bjj_address: HezBjjAddress,
    pub eth_address: EthAddress,
    pub account_creation_auth: Option<AccountCreationAuth>,
}

impl BjjWallet {
    /// Build the wallet from an already produced signature over [`HERMEZ_WALLET_MSG`]
    pub fn from_signed_message(signature: &[u8], eth_address: EthAddress) -> Result<Self> {
        let keypair = derive_from_signature(signature)?;
        let hez_bjj_address = keypair.address()?;
        info!("Derived BJJ wallet {} for {}", hez_bjj_address, eth_address);
        Ok(BjjWallet {
            keypair,
            hez_bjj_address,
            eth_address,
            account_creation_auth: None,
        })
    }

    pub fn from_eth_signer(signer: &dyn EthSigner) -> Result<Self> {
        let digest = personal_message_hash(HERMEZ_WALLET_MSG.as_bytes());
        let signature = signer.sign_digest(&digest)?;
        Self::from_signed_message(&signature, signer.address())
    }

    pub fn from_mnemonic(phrase: &str, index: u32) -> Result<Self> {
        let key = eth_key_from_mnemonic(phrase, index)?;
        debug!("Mnemonic account {} resolves to {}", index, key.address());
        Self::from_eth_signer(&key)
    }

    /// Derive the wallet and authorize account creation on `network` in one go.
    pub fn from_hex_private_key(hex_key: &str, network: &NetworkDefinition) -> Result<Self> {
        let key = EthKey::from_hex(hex_key)?;
        let mut wallet = Self::from_eth_signer(&key)?;
        let auth = auth::authorize(
            &key,
            &wallet.keypair.public_key_native(),
            network.chain_id,
            network.rollup_contract,
        )?;
        wallet.account_creation_auth = Some(auth);
        Ok(wallet)
    }

    /// `hez:0x...` form of the Ethereum address
    pub fn hez_eth_address(&self) -> String {
        self.eth_address.to_hez()
    }

    pub fn account_creation_request(&self) -> Option<AccountCreationRequest> {
        self.account_creation_auth
            .as_ref()
            .map(|auth| AccountCreationRequest::new(auth, &self.hez_bjj_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HermezConfig;
    use assert_matches::assert_matches;

    fn fixed_signature(v: u8) -> [u8; 65] {
        let mut sig = [0u8; 65];
        for (i, b) in sig.iter_mut().take(64).enumerate() {
            *b = (i + 1) as u8;
        }
        sig[64] = v;
        sig
    }

    const SEED_V28: &str = "f3781725e101628afae176e3fa9d9f5107643412bebc74ebe506959b8f1a6b9d";

    #[test]
    fn test_seed_known_vector() {
        let keypair = derive_from_signature(&fixed_signature(1)).unwrap();
        assert_eq!(hex::encode(keypair.private_key), SEED_V28);

        // Already in 27/28 form: left untouched
        let legacy = derive_from_signature(&fixed_signature(28)).unwrap();
        assert_eq!(legacy, keypair);

        let other = derive_from_signature(&fixed_signature(0)).unwrap();
        assert_ne!(other, keypair);
    }

    #[test]
    fn test_public_key_and_address_vector() {
        let keypair = derive_from_signature(&fixed_signature(1)).unwrap();
        assert_eq!(
            hex::encode(keypair.public_key_native()),
            "d1d6ec4bdd665c78144450833590ee352b77459bddeee3498cca87a54c3d1b24"
        );
        assert_eq!(
            hex::encode(keypair.public_key_compressed()),
            "241b3d4ca587ca8c49e3eedd9b45772b35ee903583504414785c66dd4becd6d1"
        );
        assert_eq!(
            keypair.address().unwrap().as_str(),
            "hez:0dbsS91mXHgURFCDNZDuNSt3RZvd7uNJjMqHpUw9GyTL"
        );
    }

    #[test]
    fn test_double_normalization_would_change_key() {
        // 1 + 27 + 27: what a second in-place correction would produce
        let doubled = fixed_signature(55);
        let seed = seed_from_signature(&doubled);
        assert_eq!(
            hex::encode(seed),
            "956e26af9e2b57a644400bc58791088136bb23b73bcc4bed924ee3805b657003"
        );
        assert_ne!(hex::encode(seed), SEED_V28);

        // and the public entry point refuses it outright
        assert_matches!(derive_from_signature(&doubled), Err(HermezError::InvalidSignature(_)));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let sig = fixed_signature(0);
        let a = derive_from_signature(&sig).unwrap();
        let b = derive_from_signature(&sig).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.address().unwrap(), b.address().unwrap());
    }

    #[test]
    fn test_compressed_key_is_byte_reversed() {
        let keypair = derive_from_signature(&fixed_signature(1)).unwrap();
        let mut reversed = keypair.public_key_native();
        reversed.reverse();
        assert_eq!(keypair.public_key_compressed(), reversed);
        assert_eq!(keypair.address().unwrap().decode().unwrap(), keypair.public_key_native());
    }

    #[test]
    fn test_rejects_bad_signature_shape() {
        assert_matches!(derive_from_signature(&[0u8; 64]), Err(HermezError::InvalidSignature(_)));
        assert_matches!(derive_from_signature(&[0u8; 66]), Err(HermezError::InvalidSignature(_)));
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = derive_from_signature(&fixed_signature(1)).unwrap();
        let msg = BigInt::from(1_234_567_890u64);
        let sig = keypair.sign(&msg).unwrap();
        assert!(keypair.verify(&msg, &sig));
        assert!(!keypair.verify(&BigInt::from(42u8), &sig));

        let other = derive_from_signature(&fixed_signature(0)).unwrap();
        assert!(!other.verify(&msg, &sig));
    }

    #[test]
    fn test_wallet_from_mnemonic() {
        let phrase = "test test test test test test test test test test test junk";
        let wallet = BjjWallet::from_mnemonic(phrase, 0).unwrap();
        assert_eq!(
            wallet.hez_eth_address(),
            "hez:0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(
            hex::encode(wallet.keypair.public_key_native()),
            "8676bea0b0bdb733514e7fb101a0842088d08d6c2a6bb4bd57879676437d1f24"
        );
        assert_eq!(
            wallet.hez_bjj_address.as_str(),
            "hez:hna-oLC9tzNRTn-xAaCEIIjQjWwqa7S9V4eWdkN9HyQJ"
        );
        assert!(wallet.account_creation_auth.is_none());

        let again = BjjWallet::from_mnemonic(phrase, 0).unwrap();
        assert_eq!(again.hez_bjj_address, wallet.hez_bjj_address);
        let second = BjjWallet::from_mnemonic(phrase, 1).unwrap();
        assert_ne!(second.hez_bjj_address, wallet.hez_bjj_address);
    }

    #[test]
    fn test_wallet_from_eth_signer_vectors() {
        // personal_sign of HERMEZ_WALLET_MSG by private key 1 (RFC 6979, low s)
        let signature = hex::decode(
            "18035e1009af9a566da98e06bcff5bacfefdb73aeef211b4705085dc776e2ac9\
             752ffb6ca3775d63b74176f1b8e2211b6834db8944ded4f13afc376a6b1774f400",
        )
        .unwrap();
        let key = EthKey::from_hex("0x0000000000000000000000000000000000000000000000000000000000000001").unwrap();
        let digest = personal_message_hash(HERMEZ_WALLET_MSG.as_bytes());
        assert_eq!(key.sign_digest(&digest).unwrap().to_vec(), signature);

        let wallet = BjjWallet::from_eth_signer(&key).unwrap();
        assert_eq!(
            hex::encode(wallet.keypair.public_key_native()),
            "b09369749dd1ad12c77373aee4fe1eebd422107fef9b9f1a196d12137cf35da0"
        );
        assert_eq!(
            wallet.hez_bjj_address.as_str(),
            "hez:sJNpdJ3RrRLHc3Ou5P4e69QiEH_vm58aGW0SE3zzXaBy"
        );
        assert_eq!(
            BjjWallet::from_signed_message(&signature, key.address()).unwrap().hez_bjj_address,
            wallet.hez_bjj_address
        );
    }

    #[test]
    fn test_wallet_from_hex_key_carries_valid_auth() {
        let config = HermezConfig::default();
        let goerli = config.network("goerli").unwrap();
        let wallet = BjjWallet::from_hex_private_key(
            "0x4e6f697354656e686f333242697473566f6365506f6465416372656469746172",
            goerli,
        )
        .unwrap();

        let auth = wallet.account_creation_auth.as_ref().unwrap();
        assert_eq!(auth.eth_addr, wallet.eth_address);
        assert_eq!(auth.bjj, wallet.keypair.public_key_native());
        assert!(auth.verify_signature(5, goerli.rollup_contract));

        let request = wallet.account_creation_request().unwrap();
        assert_eq!(request.hez_ethereum_address, wallet.hez_eth_address());
        assert_eq!(request.bjj, wallet.hez_bjj_address);
    }
}
