//! Ethereum-side key material: Keccak hashing, addresses, secp256k1 signing
//! and public key recovery.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::{HermezError, Result};

/// Compute Keccak-256 (the pre-NIST variant Ethereum uses)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash a message the way `personal_sign` / `eth_sign` does.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Map a recovery byte to the legacy 27/28 convention.
///
/// Operates on the value, not on a buffer, so applying it twice is harmless.
pub(crate) fn legacy_recovery_byte(v: u8) -> Result<u8> {
    match v {
        0 | 1 => Ok(v + 27),
        27 | 28 => Ok(v),
        other => Err(HermezError::InvalidSignature(format!(
            "unsupported recovery byte {}",
            other
        ))),
    }
}

/// 20-byte Ethereum address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EthAddress(pub [u8; 20]);

impl EthAddress {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&hash[12..]);
        EthAddress(addr)
    }

    /// EIP-55 mixed-case hex
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// `hez:0x...` form used by the coordinator API
    pub fn to_hez(&self) -> String {
        format!("hez:{}", self.to_checksum())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for EthAddress {
    type Err = HermezError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix("hez:").unwrap_or(s);
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 40 {
            return Err(HermezError::InvalidAddress(format!(
                "{}: expected 40 hex digits",
                s
            )));
        }
        let bytes = hex::decode(digits)
            .map_err(|e| HermezError::InvalidAddress(format!("{}: {}", s, e)))?;
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes);
        Ok(EthAddress(addr))
    }
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthAddress({})", self.to_checksum())
    }
}

impl Serialize for EthAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Signing capability over 32-byte digests.
///
/// Returned signatures are `r || s || v` with `v` in {0, 1}. Hardware or
/// remote signers implement this instead of handing over key material.
pub trait EthSigner {
    fn address(&self) -> EthAddress;
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 65]>;
}

/// A local secp256k1 private key
pub struct EthKey {
    signing_key: SigningKey,
}

impl EthKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| HermezError::DerivationFailed(format!("invalid secp256k1 key: {}", e)))?;
        Ok(EthKey { signing_key })
    }

    /// Parse a hex private key (0x prefix optional)
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let digits = hex_key.trim().trim_start_matches("0x");
        let bytes = hex::decode(digits).map_err(|e| HermezError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn address(&self) -> EthAddress {
        EthAddress::from_verifying_key(self.signing_key.verifying_key())
    }

    /// `personal_sign` over an arbitrary message
    pub fn sign_personal_message(&self, message: &[u8]) -> Result<[u8; 65]> {
        self.sign_digest(&personal_message_hash(message))
    }

    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 65]> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| HermezError::SigningFailed(e.to_string()))?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }
}

impl EthSigner for EthKey {
    fn address(&self) -> EthAddress {
        EthKey::address(self)
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 65]> {
        EthKey::sign_digest(self, digest)
    }
}

impl fmt::Debug for EthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthKey").field("address", &self.address()).finish()
    }
}

/// Recover the signer of `digest`. Accepts recovery byte 0/1 or 27/28.
pub fn recover_address(digest: &[u8; 32], signature: &[u8]) -> Result<EthAddress> {
    if signature.len() != 65 {
        return Err(HermezError::InvalidSignature(format!(
            "expected 65 bytes, got {}",
            signature.len()
        )));
    }
    let v = legacy_recovery_byte(signature[64])? - 27;
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| HermezError::InvalidSignature(format!("bad recovery id {}", v)))?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| HermezError::InvalidSignature(e.to_string()))?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| HermezError::InvalidSignature(e.to_string()))?;
    Ok(EthAddress::from_verifying_key(&key))
}
