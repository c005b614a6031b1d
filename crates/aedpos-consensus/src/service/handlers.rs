//! Update handlers
//!
//! Each handler checks everything against a cloned round before the first
//! write, so a failed call leaves the store as it was.

use super::ConsensusService;
use crate::domain::{
    apply_tuned_orders, calculate_lib_offset, detect_evil_miners, miners_count_at, Behaviour,
    BlockContext, ConsensusError, ConsensusResult, MinerKey, Round, TinyBlockInput,
    UpdateValueInput, TINY_BLOCKS_NUMBER,
};
use crate::events::ConsensusEvent;
use crate::metrics;
use crate::ports::{ElectionGateway, EventSink, InValueCipher, RoundStore};
use tracing::{debug, info, warn};

impl<S, E, C, V> ConsensusService<S, E, C, V>
where
    S: RoundStore,
    E: ElectionGateway,
    C: InValueCipher,
    V: EventSink,
{
    /// Sender must mine in the current or the previous round.
    pub(super) fn ensure_miner(&self, sender: &str, current: &Round) -> ConsensusResult<()> {
        let in_previous = self
            .previous_round_inner()
            .map_or(false, |p| p.is_in_miner_list(sender));
        if current.is_in_miner_list(sender) || in_previous {
            Ok(())
        } else {
            Err(ConsensusError::NotAMiner(sender.to_string()))
        }
    }

    fn check_round_id(round: &Round, round_id: i64) -> ConsensusResult<()> {
        let expected = round.round_id();
        if round_id == expected {
            Ok(())
        } else {
            Err(ConsensusError::RoundIdMismatch {
                expected,
                actual: round_id,
            })
        }
    }

    pub(super) fn update_value(
        &self,
        input: &UpdateValueInput,
        ctx: &BlockContext,
        mut round: Round,
    ) -> ConsensusResult<()> {
        Self::check_round_id(&round, input.round_id)?;
        let sender = ctx.sender.as_str();

        let miner = round
            .miner_mut(sender)
            .ok_or_else(|| ConsensusError::NotAMiner(sender.to_string()))?;
        miner.actual_mining_times.push(input.actual_mining_time);
        miner.produced_blocks = input.produced_blocks;
        miner.produced_tiny_blocks += 1;
        miner.signature = Some(input.signature);
        miner.out_value = Some(input.out_value);
        miner.promised_tiny_blocks = input.promised_tiny_blocks;
        miner.supposed_order_of_next_round = input.supposed_order_of_next_round;
        miner.final_order_of_next_round = input.supposed_order_of_next_round;
        miner.encrypted_in_values.extend(
            input
                .encrypted_in_values
                .iter()
                .map(|(peer, sealed)| (peer.clone(), sealed.clone())),
        );

        for (peer, share) in &input.decrypted_previous_in_values {
            if let Some(owner) = round.miner_mut(peer) {
                owner
                    .decrypted_previous_in_values
                    .insert(sender.to_string(), share.clone());
            }
        }

        let mut conflicting: Vec<MinerKey> = Vec::new();
        for (peer, value) in &input.miners_previous_in_values {
            if peer == sender {
                continue;
            }
            let Some(target) = round.miner_mut(peer) else {
                continue;
            };
            if target.previous_in_value.map_or(false, |known| known != *value) {
                conflicting.push(peer.clone());
            }
            target.previous_in_value = Some(*value);
        }

        apply_tuned_orders(&mut round, &input.tune_order_information)?;

        if let (Some(value), Some(miner)) = (input.previous_in_value, round.miner_mut(sender)) {
            miner.previous_in_value = Some(value);
        }

        let round_number = round.round_number;
        self.store.update_round(round.clone())?;

        for peer in conflicting {
            self.report_evil(&round, &peer, round_number);
        }
        debug!(sender, round = round_number, "Applied UpdateValue");
        Ok(())
    }

    pub(super) fn update_tiny_block_information(
        &self,
        input: &TinyBlockInput,
        ctx: &BlockContext,
        mut round: Round,
    ) -> ConsensusResult<()> {
        Self::check_round_id(&round, input.round_id)?;
        let miner = round
            .miner_mut(&ctx.sender)
            .ok_or_else(|| ConsensusError::NotAMiner(ctx.sender.clone()))?;
        miner.actual_mining_times.push(input.actual_mining_time);
        miner.produced_blocks = input.produced_blocks;
        miner.produced_tiny_blocks += 1;

        self.store.update_round(round)
    }

    pub(super) fn next_round(
        &self,
        input: &Round,
        ctx: &BlockContext,
        current: &Round,
    ) -> ConsensusResult<()> {
        if input.round_number != current.round_number + 1 {
            return Err(ConsensusError::RoundNumberSkip {
                expected: current.round_number + 1,
                actual: input.round_number,
            });
        }
        if input.term_number != current.term_number {
            return Err(ConsensusError::TermNumberSkip {
                expected: current.term_number,
                actual: input.term_number,
            });
        }
        if self.store.round(input.round_number).is_some() {
            return Err(ConsensusError::RoundAlreadyExists(input.round_number));
        }
        let evil = self
            .previous_round_inner()
            .filter(|p| p.term_number == current.term_number)
            .map(|previous| detect_evil_miners(current, &previous))
            .unwrap_or_default();

        self.record_mined_miners(current);
        self.store.add_round(input.clone())?;
        self.store.set_current_round_number(input.round_number);

        for pubkey in &evil {
            self.report_evil(current, pubkey, current.round_number);
        }

        if current.round_number == 1 && self.store.blockchain_start_timestamp().is_none() {
            let start = current.first_actual_mining_time().unwrap_or(ctx.block_time);
            self.store.set_blockchain_start_timestamp(start);
            self.request_miners_count(current.miner_count(), ctx);
        }

        metrics::record_round_advanced();
        info!(
            round = input.round_number,
            term = input.term_number,
            producer = %ctx.sender,
            "Round advanced"
        );
        Ok(())
    }

    pub(super) fn next_term(
        &self,
        input: &Round,
        ctx: &BlockContext,
        current: &Round,
    ) -> ConsensusResult<()> {
        if input.term_number != current.term_number + 1 {
            return Err(ConsensusError::TermNumberSkip {
                expected: current.term_number + 1,
                actual: input.term_number,
            });
        }
        if input.round_number != current.round_number + 1 {
            return Err(ConsensusError::RoundNumberSkip {
                expected: current.round_number + 1,
                actual: input.round_number,
            });
        }
        if self.store.round(input.round_number).is_some() {
            return Err(ConsensusError::RoundAlreadyExists(input.round_number));
        }
        if input.is_empty() {
            return Err(ConsensusError::EmptyMinerList);
        }

        self.record_mined_miners(current);

        for miner in current.real_time_miners_information.values() {
            let missed = miner.missed_time_slots + i64::from(miner.out_value.is_none());
            if let Err(e) = self.election.update_candidate_information(
                &miner.pubkey,
                miner.produced_blocks,
                missed,
                false,
            ) {
                warn!(pubkey = %miner.pubkey, error = %e, "Cannot report candidate information");
            }
        }

        self.store.add_round(input.clone())?;
        self.store
            .set_first_round_of_term(input.term_number, input.round_number);
        self.store.set_current_round_number(input.round_number);
        self.store.set_current_term_number(input.term_number);

        let initial = self
            .store
            .round(1)
            .map_or(input.miner_count(), |r| r.miner_count());
        self.request_miners_count(initial, ctx);

        let mined_blocks: i64 = current
            .real_time_miners_information
            .values()
            .map(|m| m.produced_blocks)
            .sum();
        if let Err(e) =
            self.election
                .take_snapshot(current.term_number, mined_blocks, current.round_number)
        {
            warn!(term = current.term_number, error = %e, "Cannot take election snapshot");
        }

        metrics::record_term_advanced();
        info!(
            term = input.term_number,
            round = input.round_number,
            miners = input.miner_count(),
            producer = %ctx.sender,
            "Term advanced"
        );
        Ok(())
    }

    fn record_mined_miners(&self, round: &Round) {
        let mined = round
            .mined_miners()
            .into_iter()
            .map(|m| m.pubkey.clone())
            .collect();
        self.store.set_mined_miners(round.round_number, mined);
    }

    fn request_miners_count(&self, initial_miners: usize, ctx: &BlockContext) {
        if self.config.is_side_chain() {
            return;
        }
        let Some(start) = self.store.blockchain_start_timestamp() else {
            return;
        };
        let count = miners_count_at(
            initial_miners,
            start,
            ctx.block_time,
            self.config.miners_increase_per_year,
        );
        if let Err(e) = self.election.update_miners_count(count) {
            warn!(count, error = %e, "Cannot update miners count");
        }
    }

    fn report_evil(&self, round: &Round, pubkey: &str, round_number: i64) {
        let (produced, missed) = round
            .miner(pubkey)
            .map_or((0, 0), |m| (m.produced_blocks, m.missed_time_slots));
        if let Err(e) = self
            .election
            .update_candidate_information(pubkey, produced, missed, true)
        {
            warn!(pubkey, error = %e, "Cannot report evil miner");
        }
        metrics::record_evil_miner();
        warn!(pubkey, round = round_number, "Evil miner detected");
        self.publish(ConsensusEvent::EvilMinerDetected {
            pubkey: pubkey.to_string(),
            round_number,
        });
    }

    /// LIB bookkeeping and events shared by every handler.
    pub(super) fn after_execution(&self, ctx: &BlockContext, behaviour: Behaviour) {
        if let Some(current) = self.current_round_inner() {
            let previous = self.previous_round_inner();
            let offset = calculate_lib_offset(&current, previous.as_ref());
            let advanced = self.state.record_lib(offset, ctx.block_height);
            if let Some(offset) = offset {
                metrics::set_lib_offset(offset);
                if advanced {
                    info!(
                        height = self.state.last_irreversible_height(),
                        round = current.round_number,
                        "Irreversible block advanced"
                    );
                    self.publish(ConsensusEvent::IrreversibleBlockFound {
                        offset: offset * TINY_BLOCKS_NUMBER,
                    });
                }
            }
        }

        self.publish(ConsensusEvent::MiningInformationUpdated {
            pubkey: ctx.sender.clone(),
            behaviour,
            mining_time: ctx.block_time,
            block_height: ctx.block_height,
        });
    }
}
