//! Display encodings used by the coordinator API:
//! - `hez:<base64url(pubkey || checksum)>` for BJJ public keys
//! - `hez:<SYMBOL>:<idx>` for account indexes

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{HermezError, Result};

pub const HEZ_PREFIX: &str = "hez:";

/// Checksummed display form of a compressed BJJ public key
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct HezBjjAddress(String);

fn checksum(key: &[u8]) -> u8 {
    key.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

impl HezBjjAddress {
    /// Encode a compressed public key (native byte order).
    pub fn encode(pub_key: &[u8]) -> Result<Self> {
        if pub_key.len() != 32 {
            return Err(HermezError::InvalidPublicKey(format!(
                "expected 32 compressed bytes, got {}",
                pub_key.len()
            )));
        }
        let mut raw = Vec::with_capacity(33);
        raw.extend_from_slice(pub_key);
        raw.push(checksum(pub_key));
        Ok(HezBjjAddress(format!("{}{}", HEZ_PREFIX, URL_SAFE_NO_PAD.encode(raw))))
    }

    /// Decode back to the 32 key bytes, verifying the checksum.
    pub fn decode(&self) -> Result<[u8; 32]> {
        let body = self
            .0
            .strip_prefix(HEZ_PREFIX)
            .ok_or_else(|| HermezError::InvalidAddress(format!("{}: missing hez: prefix", self.0)))?;
        let raw = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| HermezError::InvalidAddress(format!("{}: {}", self.0, e)))?;
        if raw.len() != 33 {
            return Err(HermezError::InvalidAddress(format!(
                "{}: expected 33 bytes, got {}",
                self.0,
                raw.len()
            )));
        }
        let expected = checksum(&raw[..32]);
        if raw[32] != expected {
            return Err(HermezError::ChecksumMismatch {
                address: self.0.clone(),
                expected,
                found: raw[32],
            });
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&raw[..32]);
        Ok(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for HezBjjAddress {
    type Err = HermezError;

    /// Parses and validates, so a held `HezBjjAddress` always decodes.
    fn from_str(s: &str) -> Result<Self> {
        let addr = HezBjjAddress(s.to_string());
        addr.decode()?;
        Ok(addr)
    }
}

impl fmt::Display for HezBjjAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for HezBjjAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HezBjjAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Account index as rendered by the API: `hez:<SYMBOL>:<idx>`
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AccountIndex {
    pub token_symbol: String,
    pub idx: u64,
}

impl AccountIndex {
    pub fn new(token_symbol: &str, idx: u64) -> Self {
        Self {
            token_symbol: token_symbol.to_string(),
            idx,
        }
    }
}

impl FromStr for AccountIndex {
    type Err = HermezError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(HermezError::MalformedAccountIndex(s.to_string()));
        }
        let idx = parts[2]
            .parse::<u64>()
            .map_err(|_| HermezError::MalformedAccountIndex(s.to_string()))?;
        Ok(AccountIndex {
            token_symbol: parts[1].to_string(),
            idx,
        })
    }
}

impl fmt::Display for AccountIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", HEZ_PREFIX, self.token_symbol, self.idx)
    }
}
