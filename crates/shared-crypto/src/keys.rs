//! # Miner Keys (secp256k1)
//!
//! A miner is identified by the hex encoding of its compressed secp256k1
//! public key. The same key pair drives ECDH for pairwise share delivery.

use crate::CryptoError;
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::PublicKey;
use zeroize::Zeroize;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        // Validate it's a valid compressed point
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Parse the 66-character hex form used as a miner identifier.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(encoded).map_err(|_| CryptoError::InvalidPublicKey)?;
        let bytes: [u8; 33] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(bytes)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Lower-case hex of the compressed point.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub(crate) fn to_point(self) -> Result<PublicKey, CryptoError> {
        PublicKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)
    }
}

/// secp256k1 keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Secp256k1PublicKey(bytes)
    }

    /// Hex miner identifier of this key pair.
    pub fn public_key_hex(&self) -> String {
        self.public_key().to_hex()
    }

    /// Raw ECDH shared secret (x-coordinate) with a peer.
    pub fn shared_secret(&self, peer: &Secp256k1PublicKey) -> Result<[u8; 32], CryptoError> {
        let point = peer.to_point()?;
        let shared =
            k256::ecdh::diffie_hellman(self.signing_key.as_nonzero_scalar(), point.as_affine());
        let mut out = [0u8; 32];
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(out)
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}
