//! # Shared Crypto - Consensus Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305 | Authenticated encryption |
//! | `keys` | secp256k1 | Miner identity, ECDH key agreement |
//! | `pairwise` | ECDH + XChaCha20-Poly1305 | Miner-to-miner share delivery |
//! | `secret_sharing` | Shamir over GF(2^8) | Threshold recovery of in-values |
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit random nonce, constant-time ARX design
//! - **Pairwise keys**: symmetric, `seal(A -> B)` opens at B with A's public key
//! - **Shamir**: any `t` shares recover the secret, `t - 1` shares are
//!   information-theoretically independent of it

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod keys;
pub mod pairwise;
pub mod secret_sharing;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use keys::{Secp256k1KeyPair, Secp256k1PublicKey};
pub use pairwise::PairwiseCipher;
pub use secret_sharing::{reconstruct, split, split_with_rng, threshold_for, Share};
pub use symmetric::{decrypt, encrypt, open, seal, Nonce, SecretKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
