//! Messages exchanged between the block producer, the block and every node.

use super::{Behaviour, ConsensusError, ConsensusResult, Hash, MinerKey, Round, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the producer asks consensus to build, with the data only it knows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerBehaviour {
    UpdateValue {
        random_hash: Hash,
        /// Random hash this miner used in the previous round, if it mined there
        previous_random_hash: Option<Hash>,
    },
    UpdateValueWithoutPreviousInValue {
        random_hash: Hash,
    },
    TinyBlock,
    NextRound,
    NextTerm,
}

impl TriggerBehaviour {
    pub fn behaviour(&self) -> Behaviour {
        match self {
            Self::UpdateValue { .. } => Behaviour::UpdateValue,
            Self::UpdateValueWithoutPreviousInValue { .. } => {
                Behaviour::UpdateValueWithoutPreviousInValue
            }
            Self::TinyBlock => Behaviour::TinyBlock,
            Self::NextRound => Behaviour::NextRound,
            Self::NextTerm => Behaviour::NextTerm,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInformation {
    pub pubkey: MinerKey,
    pub behaviour: TriggerBehaviour,
}

/// Consensus payload carried in a block header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInformation {
    pub sender: MinerKey,
    pub behaviour: Behaviour,
    /// The round as it should look after the block executes
    pub round: Round,
}

impl HeaderInformation {
    /// The transaction a block carrying this header must execute.
    ///
    /// `Nothing` produces no transaction.
    pub fn to_transaction(&self) -> ConsensusResult<Option<ConsensusTransaction>> {
        let transaction = match self.behaviour {
            Behaviour::UpdateValue | Behaviour::UpdateValueWithoutPreviousInValue => {
                ConsensusTransaction::UpdateValue(UpdateValueInput::from_round(
                    &self.round,
                    &self.sender,
                )?)
            }
            Behaviour::TinyBlock => ConsensusTransaction::UpdateTinyBlockInformation(
                TinyBlockInput::from_round(&self.round, &self.sender)?,
            ),
            Behaviour::NextRound => ConsensusTransaction::NextRound(self.round.clone()),
            Behaviour::NextTerm => ConsensusTransaction::NextTerm(self.round.clone()),
            Behaviour::Nothing => return Ok(None),
        };
        Ok(Some(transaction))
    }
}

/// Payload of an `UpdateValue` transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateValueInput {
    pub out_value: Hash,
    pub signature: Hash,
    pub previous_in_value: Option<Hash>,
    pub round_id: i64,
    pub actual_mining_time: Timestamp,
    pub produced_blocks: i64,
    pub supposed_order_of_next_round: i64,
    pub promised_tiny_blocks: i64,
    /// Final next-round order of every other miner that has produced
    pub tune_order_information: BTreeMap<MinerKey, i64>,
    pub encrypted_in_values: BTreeMap<MinerKey, Vec<u8>>,
    /// Shares opened by the sender, keyed by the miner that sealed them
    pub decrypted_previous_in_values: BTreeMap<MinerKey, Vec<u8>>,
    pub miners_previous_in_values: BTreeMap<MinerKey, Hash>,
}

impl UpdateValueInput {
    /// Extract the sender's update from a header round.
    pub fn from_round(round: &Round, pubkey: &str) -> ConsensusResult<Self> {
        let miner = round
            .miner(pubkey)
            .ok_or_else(|| ConsensusError::NotAMiner(pubkey.to_string()))?;
        let (Some(out_value), Some(signature)) = (miner.out_value, miner.signature) else {
            return Err(ConsensusError::MissingOutValue(pubkey.to_string()));
        };

        let others = round
            .real_time_miners_information
            .values()
            .filter(|m| m.pubkey != pubkey);

        let mut tune_order_information = BTreeMap::new();
        let mut decrypted_previous_in_values = BTreeMap::new();
        let mut miners_previous_in_values = BTreeMap::new();
        for other in others {
            if other.out_value.is_some() {
                tune_order_information.insert(other.pubkey.clone(), other.final_order_of_next_round);
            }
            if let Some(share) = other.decrypted_previous_in_values.get(pubkey) {
                decrypted_previous_in_values.insert(other.pubkey.clone(), share.clone());
            }
            if let Some(value) = other.previous_in_value {
                miners_previous_in_values.insert(other.pubkey.clone(), value);
            }
        }

        Ok(Self {
            out_value,
            signature,
            previous_in_value: miner.previous_in_value,
            round_id: round.round_id(),
            actual_mining_time: miner.actual_mining_times.last().copied().unwrap_or_default(),
            produced_blocks: miner.produced_blocks,
            supposed_order_of_next_round: miner.supposed_order_of_next_round,
            promised_tiny_blocks: miner.promised_tiny_blocks,
            tune_order_information,
            encrypted_in_values: miner.encrypted_in_values.clone(),
            decrypted_previous_in_values,
            miners_previous_in_values,
        })
    }
}

/// Payload of an `UpdateTinyBlockInformation` transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TinyBlockInput {
    pub round_id: i64,
    pub actual_mining_time: Timestamp,
    pub produced_blocks: i64,
}

impl TinyBlockInput {
    pub fn from_round(round: &Round, pubkey: &str) -> ConsensusResult<Self> {
        let miner = round
            .miner(pubkey)
            .ok_or_else(|| ConsensusError::NotAMiner(pubkey.to_string()))?;
        Ok(Self {
            round_id: round.round_id(),
            actual_mining_time: miner.actual_mining_times.last().copied().unwrap_or_default(),
            produced_blocks: miner.produced_blocks,
        })
    }
}

/// The one consensus transaction a block carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusTransaction {
    UpdateValue(UpdateValueInput),
    UpdateTinyBlockInformation(TinyBlockInput),
    NextRound(Round),
    NextTerm(Round),
}

impl ConsensusTransaction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateValue(_) => "UpdateValue",
            Self::UpdateTinyBlockInformation(_) => "UpdateTinyBlockInformation",
            Self::NextRound(_) => "NextRound",
            Self::NextTerm(_) => "NextTerm",
        }
    }
}

/// Block being executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub block_time: Timestamp,
    pub sender: MinerKey,
    pub block_height: i64,
}

/// Outcome of header validation; never an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Miners of a term. A term's first round holds at most `MAX_MINERS_COUNT` of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerList {
    pub round_number: i64,
    pub pubkeys: Vec<MinerKey>,
}
