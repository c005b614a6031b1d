//! SHA-256 digest used for in-values, out-values, signatures and round hashes.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha2::{Digest, Sha256};
use std::fmt;

/// 32-byte SHA-256 digest, serialized as hex.
#[serde_as]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(#[serde_as(as = "Hex")] [u8; 32]);

impl Hash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// All-zero digest, the seed of signature folding.
    pub const fn empty() -> Self {
        Self([0u8; 32])
    }

    pub fn compute_from(data: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(data.as_ref()).into())
    }

    /// `SHA-256(a || b)`.
    pub fn concat_and_compute(a: &Hash, b: &Hash) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(a.0);
        hasher.update(b.0);
        Self(hasher.finalize().into())
    }

    /// Digest of the big-endian encoding of `value`.
    pub fn from_i64(value: i64) -> Self {
        Self::compute_from(value.to_be_bytes())
    }

    /// First eight bytes read as a big-endian signed integer.
    pub fn to_i64(&self) -> i64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        i64::from_be_bytes(head)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a 32-byte slice, `None` on any other length.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}..)", &self.to_hex()[..12])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
