//! Election adapter
//!
//! Implements the ElectionGateway port with configurable victories and
//! vote snapshots, and records everything consensus reports back.

use crate::domain::MinerKey;
use crate::ports::ElectionGateway;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// Per-candidate report as last sent by consensus.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub produced_blocks: i64,
    pub missed_time_slots: i64,
    pub is_evil: bool,
}

/// Snapshot request recorded at the end of a term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TakenSnapshot {
    pub term_number: i64,
    pub mined_blocks: i64,
    pub round_number: i64,
}

#[derive(Default)]
struct ElectionInner {
    victories: Vec<MinerKey>,
    term_snapshots: BTreeMap<i64, BTreeMap<MinerKey, i64>>,
    candidates: BTreeMap<MinerKey, CandidateRecord>,
    evil: BTreeSet<MinerKey>,
    miners_counts: Vec<i64>,
    snapshots_taken: Vec<TakenSnapshot>,
}

/// In-memory election contract
pub struct InMemoryElection {
    inner: RwLock<ElectionInner>,
}

impl InMemoryElection {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ElectionInner::default()),
        }
    }

    /// Election with a fixed winner list.
    pub fn with_victories(victories: Vec<MinerKey>) -> Self {
        let election = Self::new();
        election.set_victories(victories);
        election
    }

    pub fn set_victories(&self, victories: Vec<MinerKey>) {
        self.inner.write().victories = victories;
    }

    pub fn set_term_snapshot(&self, term_number: i64, votes: BTreeMap<MinerKey, i64>) {
        self.inner.write().term_snapshots.insert(term_number, votes);
    }

    pub fn candidate(&self, pubkey: &str) -> Option<CandidateRecord> {
        self.inner.read().candidates.get(pubkey).cloned()
    }

    /// Whether consensus ever reported `pubkey` as evil.
    pub fn is_evil(&self, pubkey: &str) -> bool {
        self.inner.read().evil.contains(pubkey)
    }

    pub fn evil_miners(&self) -> Vec<MinerKey> {
        self.inner.read().evil.iter().cloned().collect()
    }

    pub fn miners_counts(&self) -> Vec<i64> {
        self.inner.read().miners_counts.clone()
    }

    pub fn snapshots_taken(&self) -> Vec<TakenSnapshot> {
        self.inner.read().snapshots_taken.clone()
    }
}

impl Default for InMemoryElection {
    fn default() -> Self {
        Self::new()
    }
}

impl ElectionGateway for InMemoryElection {
    fn get_victories(&self) -> Result<Vec<MinerKey>, String> {
        Ok(self.inner.read().victories.clone())
    }

    fn get_term_snapshot(&self, term_number: i64) -> Result<BTreeMap<MinerKey, i64>, String> {
        Ok(self
            .inner
            .read()
            .term_snapshots
            .get(&term_number)
            .cloned()
            .unwrap_or_default())
    }

    fn update_candidate_information(
        &self,
        pubkey: &str,
        produced_blocks: i64,
        missed_time_slots: i64,
        is_evil: bool,
    ) -> Result<(), String> {
        let mut inner = self.inner.write();
        if is_evil {
            inner.evil.insert(pubkey.to_string());
        }
        let record = inner.candidates.entry(pubkey.to_string()).or_default();
        record.produced_blocks = produced_blocks;
        record.missed_time_slots = missed_time_slots;
        record.is_evil |= is_evil;
        Ok(())
    }

    fn update_miners_count(&self, miners_count: i64) -> Result<(), String> {
        if miners_count <= 0 {
            return Err(format!("invalid miners count {miners_count}"));
        }
        self.inner.write().miners_counts.push(miners_count);
        Ok(())
    }

    fn take_snapshot(
        &self,
        term_number: i64,
        mined_blocks: i64,
        round_number: i64,
    ) -> Result<(), String> {
        self.inner.write().snapshots_taken.push(TakenSnapshot {
            term_number,
            mined_blocks,
            round_number,
        });
        Ok(())
    }
}
