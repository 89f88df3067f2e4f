use crate::error::{HermezError, Result};

/// Trait for objects that have a canonical binary representation for hashing.
/// careful: the coordinator recomputes these bytes, so layouts are fixed-width big-endian.
pub trait CanonicalSerialize {
    fn canonical_serialize(&self, buf: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.canonical_serialize(&mut buf);
        buf
    }
}

/// Last `N` bytes of the big-endian representation, rejecting values that do not fit.
pub fn be_bytes<const N: usize>(value: u64, field: &str) -> Result<[u8; N]> {
    if value.checked_shr((8 * N) as u32).unwrap_or(0) != 0 {
        return Err(HermezError::Serialization(format!(
            "{} {} does not fit in {} bytes",
            field, value, N
        )));
    }
    let full = value.to_be_bytes();
    let mut out = [0u8; N];
    out.copy_from_slice(&full[8 - N..]);
    Ok(out)
}

const F40_MANTISSA_LIMIT: u128 = 1 << 35;
const F40_MAX_EXPONENT: u64 = 31;

/// Amount encoded as `mantissa (35 bits) + exponent (5 bits) * 2^35`,
/// value = mantissa * 10^exponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Float40(u64);

impl Float40 {
    /// Exact encoding; amounts that would lose precision are rejected.
    pub fn from_amount(amount: u128) -> Result<Self> {
        let mut mantissa = amount;
        let mut exponent = 0u64;
        while mantissa % 10 == 0 && mantissa >= F40_MANTISSA_LIMIT {
            mantissa /= 10;
            exponent += 1;
        }
        if exponent > F40_MAX_EXPONENT || mantissa >= F40_MANTISSA_LIMIT {
            return Err(HermezError::AmountNotRepresentable(amount.to_string()));
        }
        Ok(Float40(mantissa as u64 + (exponent << 35)))
    }

    pub fn to_amount(&self) -> u128 {
        let mantissa = (self.0 & ((1 << 35) - 1)) as u128;
        let exponent = (self.0 >> 35) as u32;
        mantissa * 10u128.pow(exponent)
    }

    pub fn to_bytes(&self) -> [u8; 5] {
        let full = self.0.to_be_bytes();
        let mut out = [0u8; 5];
        out.copy_from_slice(&full[3..]);
        out
    }
}

impl CanonicalSerialize for Float40 {
    fn canonical_serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_bytes());
    }
}
