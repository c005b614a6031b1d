//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Sealed payload shorter than its nonce prefix
    #[error("Sealed payload too short: {len} bytes")]
    SealedPayloadTooShort {
        /// Actual payload length in bytes
        len: usize,
    },

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Threshold parameters out of range
    #[error("Invalid threshold: {threshold} of {total}")]
    InvalidThreshold {
        /// Shares required for recovery
        threshold: usize,
        /// Shares produced
        total: usize,
    },

    /// Not enough shares to reach the threshold
    #[error("Insufficient shares: got {got}, need {need}")]
    InsufficientShares {
        /// Shares supplied
        got: usize,
        /// Shares required
        need: usize,
    },

    /// Shares do not describe one polynomial
    #[error("Malformed shares: {0}")]
    MalformedShares(String),
}
