//! # Pairwise Cipher
//!
//! Seals a message for one peer. The symmetric key is
//! `SHA-256(ECDH_x(own_secret, peer_public))`, identical on both ends, so a
//! payload sealed by A for B opens at B given A's public key.

use crate::keys::{Secp256k1KeyPair, Secp256k1PublicKey};
use crate::symmetric::{self, SecretKey};
use crate::CryptoError;
use sha2::{Digest, Sha256};

/// Encrypts and decrypts messages exchanged with individual peers.
pub struct PairwiseCipher {
    keypair: Secp256k1KeyPair,
}

impl PairwiseCipher {
    /// Wrap a miner key pair.
    pub fn new(keypair: Secp256k1KeyPair) -> Self {
        Self { keypair }
    }

    /// Hex identifier of the owning miner.
    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }

    /// Seal `plaintext` for `recipient`.
    pub fn seal(
        &self,
        recipient: &Secp256k1PublicKey,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.pair_key(recipient)?;
        symmetric::seal(&key, plaintext)
    }

    /// Open a payload that `sender` sealed for this miner.
    pub fn open(&self, sender: &Secp256k1PublicKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = self.pair_key(sender)?;
        symmetric::open(&key, sealed)
    }

    fn pair_key(&self, peer: &Secp256k1PublicKey) -> Result<SecretKey, CryptoError> {
        let shared = self.keypair.shared_secret(peer)?;
        let digest: [u8; 32] = Sha256::digest(shared).into();
        Ok(SecretKey::from_bytes(digest))
    }
}
