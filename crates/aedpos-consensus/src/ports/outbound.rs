//! Driven ports (Outbound dependencies)

use crate::domain::{ConsensusResult, MinerKey, Round, Timestamp};
use crate::events::ConsensusEvent;
use std::collections::BTreeMap;

/// Persistent consensus state.
///
/// Rounds are added once and never deleted. Pointers only move forward.
pub trait RoundStore: Send + Sync {
    fn round(&self, round_number: i64) -> Option<Round>;

    /// Fails with `RoundAlreadyExists` if the number is taken.
    fn add_round(&self, round: Round) -> ConsensusResult<()>;

    /// Replace an existing round; fails with `RoundNotFound` otherwise.
    fn update_round(&self, round: Round) -> ConsensusResult<()>;

    /// 0 before initialization.
    fn current_round_number(&self) -> i64;

    fn set_current_round_number(&self, round_number: i64);

    fn current_term_number(&self) -> i64;

    fn set_current_term_number(&self, term_number: i64);

    fn blockchain_start_timestamp(&self) -> Option<Timestamp>;

    fn set_blockchain_start_timestamp(&self, timestamp: Timestamp);

    fn mining_interval(&self) -> Option<i64>;

    fn set_mining_interval(&self, interval_ms: i64);

    fn time_each_term_secs(&self) -> Option<i64>;

    fn set_time_each_term_secs(&self, secs: i64);

    fn first_round_of_term(&self, term_number: i64) -> Option<i64>;

    fn set_first_round_of_term(&self, term_number: i64, round_number: i64);

    fn mined_miners(&self, round_number: i64) -> Option<Vec<MinerKey>>;

    fn set_mined_miners(&self, round_number: i64, miners: Vec<MinerKey>);
}

/// Election contract as seen by consensus.
pub trait ElectionGateway: Send + Sync {
    /// Winners of the latest election, best first.
    fn get_victories(&self) -> Result<Vec<MinerKey>, String>;

    /// Votes per candidate recorded at the end of `term_number`.
    fn get_term_snapshot(&self, term_number: i64) -> Result<BTreeMap<MinerKey, i64>, String>;

    fn update_candidate_information(
        &self,
        pubkey: &str,
        produced_blocks: i64,
        missed_time_slots: i64,
        is_evil: bool,
    ) -> Result<(), String>;

    fn update_miners_count(&self, miners_count: i64) -> Result<(), String>;

    fn take_snapshot(
        &self,
        term_number: i64,
        mined_blocks: i64,
        round_number: i64,
    ) -> Result<(), String>;
}

/// Seals Shamir shares for a single peer.
pub trait InValueCipher: Send + Sync {
    fn encrypt_message(&self, recipient: &str, plaintext: &[u8]) -> ConsensusResult<Vec<u8>>;

    fn decrypt_message(&self, sender: &str, ciphertext: &[u8]) -> ConsensusResult<Vec<u8>>;
}

/// Outlet for published consensus events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ConsensusEvent) -> Result<(), String>;
}
