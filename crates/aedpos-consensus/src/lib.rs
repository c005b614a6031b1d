//! # aedpos-consensus
//!
//! Round-based delegated proof-of-stake consensus core.
//!
//! ## Architecture
//!
//! A fixed set of miners takes turns producing blocks in time slots. Each
//! round every miner commits to a random value and reveals it one round
//! later; the signatures of those commitments decide the miner order of the
//! next round. Rounds are grouped into terms, and the election contract
//! chooses the miners of each new term.
//!
//! ```text
//!   get_consensus_command ──→ decide_behaviour ──→ ConsensusCommand
//!                                                      │
//!   get_information_to_update_consensus  ←─────────────┘  (producer)
//!            │
//!            ↓ HeaderInformation / ConsensusTransaction
//!   validate_before ──→ execute ──→ validate_after          (every node)
//!                          │
//!                          ↓
//!            [RoundStore]  [ElectionGateway]  [EventSink]
//! ```
//!
//! ### Determinism
//!
//! The core never reads a clock. Every node applying the same transactions
//! with the same block times ends with an identical round hash.
//!
//! ### Commit-reveal
//!
//! A miner's in-value is also split into Shamir shares sealed for its peers,
//! so a miner that stops producing cannot withhold its contribution.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aedpos_consensus::{ConsensusDependencies, ConsensusService, ConsensusApi};
//!
//! let service = ConsensusService::new(ConsensusDependencies {
//!     store, election, cipher, event_sink,
//!     config: ConsensusConfig::default(),
//! });
//! service.initialize(generate_genesis_round(&miners, 4_000, start)?)?;
//!
//! let command = service.get_consensus_command(&me, now);
//! ```

pub mod adapters;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod state;
pub mod validation;

// Re-export main types
pub use adapters::{InMemoryElection, InMemoryEventSink, InMemoryRoundStore, SealedBoxCipher};
pub use domain::{
    generate_genesis_round, Behaviour, BlockContext, ConsensusCommand, ConsensusConfig,
    ConsensusError, ConsensusResult, ConsensusTransaction, Hash, HeaderInformation, MinerInRound,
    MinerKey, MinerList, Round, Timestamp, TriggerBehaviour, TriggerInformation,
    ValidationResult,
};
pub use events::ConsensusEvent;
pub use ports::{ConsensusApi, ElectionGateway, EventSink, InValueCipher, RoundStore};
pub use service::{ConsensusDependencies, ConsensusService};
