//! Error types for the consensus core

use super::MinerKey;

/// Consensus error types
///
/// A handler returning any of these has left the round store untouched.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("Consensus already initialized")]
    AlreadyInitialized,

    #[error("Consensus not initialized")]
    NotInitialized,

    #[error("Invalid first round: {0}")]
    InvalidFirstRound(String),

    #[error("Round {0} not found")]
    RoundNotFound(i64),

    #[error("Round {0} already exists")]
    RoundAlreadyExists(i64),

    #[error("Round id mismatch: expected {expected}, got {actual}")]
    RoundIdMismatch { expected: i64, actual: i64 },

    #[error("Round number skip: expected {expected}, got {actual}")]
    RoundNumberSkip { expected: i64, actual: i64 },

    #[error("Term number skip: expected {expected}, got {actual}")]
    TermNumberSkip { expected: i64, actual: i64 },

    #[error("Not a miner: {0}")]
    NotAMiner(MinerKey),

    #[error("Empty miner list")]
    EmptyMinerList,

    #[error("Too many miners: {count}, at most {max}")]
    TooManyMiners { count: usize, max: usize },

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid order {order} for {pubkey}, round has {miners} miners")]
    InvalidOrder {
        pubkey: MinerKey,
        order: i64,
        miners: usize,
    },

    #[error("Miner {0} has no out value")]
    MissingOutValue(MinerKey),

    #[error("Order tuned for miner without out value: {0}")]
    TuneWithoutOutValue(MinerKey),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("Secret sharing error: {0}")]
    SecretSharing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Election error: {0}")]
    Election(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
