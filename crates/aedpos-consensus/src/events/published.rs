//! Published events (Outgoing)

use crate::domain::{Behaviour, MinerKey, Timestamp};
use serde::{Deserialize, Serialize};

/// Emitted by the consensus handlers after a block has been applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusEvent {
    /// Bookkeeping for the miner that produced the block
    MiningInformationUpdated {
        pubkey: MinerKey,
        behaviour: Behaviour,
        mining_time: Timestamp,
        block_height: i64,
    },

    /// Blocks at or below `block_height - offset` are final.
    IrreversibleBlockFound { offset: i64 },

    /// A miner revealed a previous in-value that does not match its commitment.
    EvilMinerDetected { pubkey: MinerKey, round_number: i64 },
}

impl ConsensusEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MiningInformationUpdated { .. } => "MiningInformationUpdated",
            Self::IrreversibleBlockFound { .. } => "IrreversibleBlockFound",
            Self::EvilMinerDetected { .. } => "EvilMinerDetected",
        }
    }
}
