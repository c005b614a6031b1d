//! In-value cipher adapter
//!
//! Implements the InValueCipher port with ECDH-derived pairwise keys, so a
//! share sealed for a peer can only be opened by that peer.

use crate::domain::{ConsensusError, ConsensusResult};
use crate::ports::InValueCipher;
use shared_crypto::{PairwiseCipher, Secp256k1KeyPair, Secp256k1PublicKey};

/// Cipher bound to one miner's key pair.
pub struct SealedBoxCipher {
    cipher: PairwiseCipher,
}

impl SealedBoxCipher {
    pub fn new(keypair: Secp256k1KeyPair) -> Self {
        Self {
            cipher: PairwiseCipher::new(keypair),
        }
    }

    /// Cipher with a fresh random key pair.
    pub fn generate() -> Self {
        Self::new(Secp256k1KeyPair::generate())
    }

    /// Hex public key, usable as the miner's key in a round.
    pub fn public_key_hex(&self) -> String {
        self.cipher.public_key_hex()
    }

    fn peer_key(pubkey: &str) -> ConsensusResult<Secp256k1PublicKey> {
        Secp256k1PublicKey::from_hex(pubkey)
            .map_err(|_| ConsensusError::InvalidPublicKey(pubkey.to_string()))
    }
}

impl InValueCipher for SealedBoxCipher {
    fn encrypt_message(&self, recipient: &str, plaintext: &[u8]) -> ConsensusResult<Vec<u8>> {
        let peer = Self::peer_key(recipient)?;
        self.cipher
            .seal(&peer, plaintext)
            .map_err(|e| ConsensusError::Cipher(e.to_string()))
    }

    fn decrypt_message(&self, sender: &str, ciphertext: &[u8]) -> ConsensusResult<Vec<u8>> {
        let peer = Self::peer_key(sender)?;
        self.cipher
            .open(&peer, ciphertext)
            .map_err(|e| ConsensusError::Cipher(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_reaches_only_its_recipient() {
        let alice = SealedBoxCipher::generate();
        let bob = SealedBoxCipher::generate();
        let carol = SealedBoxCipher::generate();

        let sealed = alice
            .encrypt_message(&bob.public_key_hex(), b"share")
            .unwrap();
        let opened = bob.decrypt_message(&alice.public_key_hex(), &sealed).unwrap();
        assert_eq!(opened, b"share");

        let err = carol
            .decrypt_message(&alice.public_key_hex(), &sealed)
            .unwrap_err();
        assert!(matches!(err, ConsensusError::Cipher(_)));
    }

    #[test]
    fn test_rejects_malformed_key() {
        let alice = SealedBoxCipher::generate();
        assert!(matches!(
            alice.encrypt_message("zz", b"x"),
            Err(ConsensusError::InvalidPublicKey(_))
        ));
    }
}
