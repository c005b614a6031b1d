//! Round and per-miner state.

use super::{ConsensusError, ConsensusResult, Hash, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hex encoding of a miner's compressed secp256k1 public key.
pub type MinerKey = String;

/// One miner's state inside a round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerInRound {
    pub pubkey: MinerKey,
    /// Position in the round, `1..=N`
    pub order: i64,
    pub expected_mining_time: Timestamp,
    pub actual_mining_times: Vec<Timestamp>,
    pub produced_blocks: i64,
    pub produced_tiny_blocks: i64,
    pub missed_time_slots: i64,
    pub out_value: Option<Hash>,
    /// Never published while the round is live
    pub in_value: Option<Hash>,
    /// This miner's in-value of the previous round, once revealed
    pub previous_in_value: Option<Hash>,
    pub signature: Option<Hash>,
    /// Shares of this miner's in-value, sealed for each peer
    pub encrypted_in_values: BTreeMap<MinerKey, Vec<u8>>,
    /// Shares of this miner's previous in-value, opened by each peer
    pub decrypted_previous_in_values: BTreeMap<MinerKey, Vec<u8>>,
    /// 0 until the miner has produced in this round
    pub supposed_order_of_next_round: i64,
    /// 0 until the miner has produced in this round
    pub final_order_of_next_round: i64,
    pub promised_tiny_blocks: i64,
    pub is_extra_block_producer: bool,
}

impl MinerInRound {
    pub fn new(pubkey: impl Into<MinerKey>, order: i64, expected_mining_time: Timestamp) -> Self {
        Self {
            pubkey: pubkey.into(),
            order,
            expected_mining_time,
            ..Self::default()
        }
    }

    pub fn has_mined(&self) -> bool {
        self.out_value.is_some()
    }
}

/// One cycle through every miner's time slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub round_number: i64,
    pub term_number: i64,
    /// Keyed by pubkey; `order` carries the logical sequence.
    pub real_time_miners_information: BTreeMap<MinerKey, MinerInRound>,
    /// Seconds since the blockchain start timestamp
    pub blockchain_age: i64,
    pub extra_block_producer_of_previous_round: Option<MinerKey>,
}

impl Round {
    pub fn new(round_number: i64, term_number: i64) -> Self {
        Self {
            round_number,
            term_number,
            ..Self::default()
        }
    }

    /// Sum of every expected mining time in seconds; 0 for an empty round.
    pub fn round_id(&self) -> i64 {
        self.real_time_miners_information
            .values()
            .map(|m| m.expected_mining_time.as_seconds())
            .fold(0i64, i64::wrapping_add)
    }

    pub fn miner_count(&self) -> usize {
        self.real_time_miners_information.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real_time_miners_information.is_empty()
    }

    pub fn miner(&self, pubkey: &str) -> Option<&MinerInRound> {
        self.real_time_miners_information.get(pubkey)
    }

    pub fn miner_mut(&mut self, pubkey: &str) -> Option<&mut MinerInRound> {
        self.real_time_miners_information.get_mut(pubkey)
    }

    pub fn is_in_miner_list(&self, pubkey: &str) -> bool {
        self.real_time_miners_information.contains_key(pubkey)
    }

    pub fn miner_keys(&self) -> Vec<MinerKey> {
        self.real_time_miners_information.keys().cloned().collect()
    }

    /// Miners sorted by `order`.
    pub fn ordered_miners(&self) -> Vec<&MinerInRound> {
        let mut miners: Vec<&MinerInRound> = self.real_time_miners_information.values().collect();
        miners.sort_by_key(|m| m.order);
        miners
    }

    pub fn miner_at_order(&self, order: i64) -> Option<&MinerInRound> {
        self.real_time_miners_information
            .values()
            .find(|m| m.order == order)
    }

    /// The boot miner of the round.
    pub fn first_miner(&self) -> Option<&MinerInRound> {
        self.miner_at_order(1)
    }

    pub fn extra_block_producer(&self) -> Option<&MinerInRound> {
        self.real_time_miners_information
            .values()
            .find(|m| m.is_extra_block_producer)
    }

    /// Miners that published an out-value this round.
    pub fn mined_miners(&self) -> Vec<&MinerInRound> {
        self.real_time_miners_information
            .values()
            .filter(|m| m.has_mined())
            .collect()
    }

    pub fn out_value_count(&self) -> usize {
        self.real_time_miners_information
            .values()
            .filter(|m| m.has_mined())
            .count()
    }

    /// Earliest actual mining time of any miner.
    pub fn first_actual_mining_time(&self) -> Option<Timestamp> {
        self.real_time_miners_information
            .values()
            .flat_map(|m| m.actual_mining_times.iter().copied())
            .min()
    }

    /// Copy of the round holding only fields every node agrees on.
    ///
    /// Share maps and actual mining times differ per node view and are
    /// cleared; `previous_in_value` is kept only on request.
    pub fn checkable(&self, include_previous_in_value: bool) -> Round {
        let mut round = self.clone();
        for miner in round.real_time_miners_information.values_mut() {
            miner.encrypted_in_values.clear();
            miner.decrypted_previous_in_values.clear();
            miner.actual_mining_times.clear();
            if !include_previous_in_value {
                miner.previous_in_value = None;
            }
        }
        round
    }

    /// SHA-256 over the bincode encoding of [`Round::checkable`].
    pub fn get_hash(&self, include_previous_in_value: bool) -> ConsensusResult<Hash> {
        let encoded = bincode::serialize(&self.checkable(include_previous_in_value))
            .map_err(|e| ConsensusError::Serialization(e.to_string()))?;
        Ok(Hash::compute_from(encoded))
    }
}
