use thiserror::Error;

#[derive(Error, Debug)]
pub enum HermezError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),
    #[error("Invalid BJJ public key: {0}")]
    InvalidPublicKey(String),
    #[error("Checksum mismatch in {address}: expected {expected:#04x}, got {found:#04x}")]
    ChecksumMismatch {
        address: String,
        expected: u8,
        found: u8,
    },
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),
    #[error("There is no account for {address} holding token {token}")]
    NoAccountForToken { address: String, token: String },
    #[error("Recipient {address} has no account for token {token}")]
    RecipientAccountNotFound { address: String, token: String },
    #[error("Malformed account index: {0}")]
    MalformedAccountIndex(String),
    #[error("Invalid request offset {offset} for transaction at position {position}")]
    InvalidLinkOffset { position: usize, offset: u8 },
    #[error("Request offset {offset} at position {position} targets {target}, outside a group of {len}")]
    LinkTargetOutOfRange {
        position: usize,
        offset: u8,
        target: i64,
        len: usize,
    },
    #[error("Chain id {0} out of range (max 65535)")]
    ChainIdOutOfRange(u64),
    #[error("Account creation signature does not verify against signer {0}")]
    SignatureSelfCheckFailed(String),
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("Amount {0} cannot be encoded as Float40")]
    AmountNotRepresentable(String),
    #[error("Atomic group has no transactions")]
    EmptyGroup,
    #[error("Atomic group must be identified before signing")]
    GroupNotIdentified,
    #[error("Expected {expected} signing keys, got {found}")]
    SignerCountMismatch { expected: usize, found: usize },
    #[error("Signing key for transaction {position} ({tx_id}) is not the sender's BJJ key")]
    SignerKeyMismatch { position: usize, tx_id: String },
    #[error("Hermez definition for network {0} not found")]
    NetworkNotFound(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Coordinator returned HTTP {status}: {body}")]
    Coordinator { status: u16, body: String },
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Only {forged}/{total} transactions of the atomic group were forged")]
    PartiallyForged { forged: usize, total: usize },
}

impl From<reqwest::Error> for HermezError {
    fn from(err: reqwest::Error) -> Self {
        HermezError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for HermezError {
    fn from(err: serde_json::Error) -> Self {
        HermezError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for HermezError {
    fn from(err: toml::de::Error) -> Self {
        HermezError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HermezError>;
