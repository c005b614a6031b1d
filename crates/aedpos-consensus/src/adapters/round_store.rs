//! Round store adapter
//!
//! Implements the RoundStore port over plain maps.

use crate::domain::{ConsensusError, ConsensusResult, MinerKey, Round, Timestamp};
use crate::ports::RoundStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Default)]
struct StoreInner {
    rounds: BTreeMap<i64, Round>,
    current_round_number: i64,
    current_term_number: i64,
    blockchain_start_timestamp: Option<Timestamp>,
    mining_interval: Option<i64>,
    time_each_term_secs: Option<i64>,
    first_round_of_term: BTreeMap<i64, i64>,
    mined_miners: BTreeMap<i64, Vec<MinerKey>>,
}

/// In-memory round store
pub struct InMemoryRoundStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryRoundStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    pub fn round_count(&self) -> usize {
        self.inner.read().rounds.len()
    }
}

impl Default for InMemoryRoundStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundStore for InMemoryRoundStore {
    fn round(&self, round_number: i64) -> Option<Round> {
        self.inner.read().rounds.get(&round_number).cloned()
    }

    fn add_round(&self, round: Round) -> ConsensusResult<()> {
        let mut inner = self.inner.write();
        if inner.rounds.contains_key(&round.round_number) {
            return Err(ConsensusError::RoundAlreadyExists(round.round_number));
        }
        inner.rounds.insert(round.round_number, round);
        Ok(())
    }

    fn update_round(&self, round: Round) -> ConsensusResult<()> {
        let mut inner = self.inner.write();
        match inner.rounds.get_mut(&round.round_number) {
            Some(slot) => {
                *slot = round;
                Ok(())
            }
            None => Err(ConsensusError::RoundNotFound(round.round_number)),
        }
    }

    fn current_round_number(&self) -> i64 {
        self.inner.read().current_round_number
    }

    fn set_current_round_number(&self, round_number: i64) {
        self.inner.write().current_round_number = round_number;
    }

    fn current_term_number(&self) -> i64 {
        self.inner.read().current_term_number
    }

    fn set_current_term_number(&self, term_number: i64) {
        self.inner.write().current_term_number = term_number;
    }

    fn blockchain_start_timestamp(&self) -> Option<Timestamp> {
        self.inner.read().blockchain_start_timestamp
    }

    fn set_blockchain_start_timestamp(&self, timestamp: Timestamp) {
        self.inner.write().blockchain_start_timestamp = Some(timestamp);
    }

    fn mining_interval(&self) -> Option<i64> {
        self.inner.read().mining_interval
    }

    fn set_mining_interval(&self, interval_ms: i64) {
        self.inner.write().mining_interval = Some(interval_ms);
    }

    fn time_each_term_secs(&self) -> Option<i64> {
        self.inner.read().time_each_term_secs
    }

    fn set_time_each_term_secs(&self, secs: i64) {
        self.inner.write().time_each_term_secs = Some(secs);
    }

    fn first_round_of_term(&self, term_number: i64) -> Option<i64> {
        self.inner.read().first_round_of_term.get(&term_number).copied()
    }

    fn set_first_round_of_term(&self, term_number: i64, round_number: i64) {
        self.inner
            .write()
            .first_round_of_term
            .insert(term_number, round_number);
    }

    fn mined_miners(&self, round_number: i64) -> Option<Vec<MinerKey>> {
        self.inner.read().mined_miners.get(&round_number).cloned()
    }

    fn set_mined_miners(&self, round_number: i64, miners: Vec<MinerKey>) {
        self.inner.write().mined_miners.insert(round_number, miners);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_round_rejects_collision() {
        let store = InMemoryRoundStore::new();
        store.add_round(Round::new(1, 1)).unwrap();

        let err = store.add_round(Round::new(1, 1)).unwrap_err();
        assert!(matches!(err, ConsensusError::RoundAlreadyExists(1)));
        assert_eq!(store.round_count(), 1);
    }

    #[test]
    fn test_update_requires_existing_round() {
        let store = InMemoryRoundStore::new();
        assert!(matches!(
            store.update_round(Round::new(3, 1)),
            Err(ConsensusError::RoundNotFound(3))
        ));

        store.add_round(Round::new(3, 1)).unwrap();
        let mut updated = Round::new(3, 1);
        updated.blockchain_age = 42;
        store.update_round(updated).unwrap();
        assert_eq!(store.round(3).unwrap().blockchain_age, 42);
    }

    #[test]
    fn test_pointers_and_settings() {
        let store = InMemoryRoundStore::default();
        assert_eq!(store.current_round_number(), 0);
        assert!(store.blockchain_start_timestamp().is_none());

        store.set_current_round_number(5);
        store.set_current_term_number(2);
        store.set_blockchain_start_timestamp(Timestamp::from_millis(10));
        store.set_mining_interval(4_000);
        store.set_time_each_term_secs(60);
        store.set_first_round_of_term(2, 4);
        store.set_mined_miners(4, vec!["a".into()]);

        assert_eq!(store.current_round_number(), 5);
        assert_eq!(store.current_term_number(), 2);
        assert_eq!(store.blockchain_start_timestamp(), Some(Timestamp::from_millis(10)));
        assert_eq!(store.mining_interval(), Some(4_000));
        assert_eq!(store.time_each_term_secs(), Some(60));
        assert_eq!(store.first_round_of_term(2), Some(4));
        assert_eq!(store.mined_miners(4), Some(vec!["a".to_string()]));
    }
}
