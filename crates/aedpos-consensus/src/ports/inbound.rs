//! Driving ports (Inbound API)

use crate::domain::{
    BlockContext, ConsensusCommand, ConsensusResult, ConsensusTransaction, HeaderInformation,
    MinerKey, MinerList, Round, Timestamp, TriggerInformation, ValidationResult,
};

/// Primary consensus API
///
/// Every call is synchronous and deterministic; time always comes from
/// the caller.
pub trait ConsensusApi: Send + Sync {
    /// Store the first round of the chain.
    fn initialize(&self, first_round: Round) -> ConsensusResult<()>;

    /// When and how `pubkey` should produce its next block.
    fn get_consensus_command(&self, pubkey: &str, now: Timestamp) -> ConsensusCommand;

    /// Build the consensus payload of a block the caller is producing.
    fn get_information_to_update_consensus(
        &self,
        trigger: &TriggerInformation,
        now: Timestamp,
    ) -> ConsensusResult<HeaderInformation>;

    /// Wrap the payload into the transaction the block carries.
    fn generate_consensus_transactions(
        &self,
        trigger: &TriggerInformation,
        now: Timestamp,
    ) -> ConsensusResult<Vec<ConsensusTransaction>>;

    fn validate_consensus_before_execution(&self, header: &HeaderInformation) -> ValidationResult;

    fn validate_consensus_after_execution(&self, header: &HeaderInformation) -> ValidationResult;

    /// Apply a consensus transaction.
    ///
    /// # Errors
    /// On any error the round store is left exactly as it was.
    fn execute(&self, transaction: &ConsensusTransaction, ctx: &BlockContext)
        -> ConsensusResult<()>;

    fn current_round(&self) -> Option<Round>;

    fn previous_round(&self) -> Option<Round>;

    fn round(&self, round_number: i64) -> Option<Round>;

    fn current_miner_list(&self) -> Option<MinerList>;

    fn current_term_number(&self) -> i64;

    /// Last computed irreversible offset, 0 when none.
    fn lib_offset(&self) -> i64;

    fn mined_miners(&self, round_number: i64) -> Option<Vec<MinerKey>>;

    fn blockchain_start_timestamp(&self) -> Option<Timestamp>;
}
