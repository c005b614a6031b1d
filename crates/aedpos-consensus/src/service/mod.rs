//! Consensus Service - Core business logic
//!
//! # Architecture
//! - Producer side: commands and header information for the local miner
//! - Executor side: header validation and the update handlers in `handlers`
//! - Every consensus-critical value lives behind the `RoundStore` port
//! - Time is always supplied by the caller

mod handlers;

use crate::domain::{
    apply_normal_consensus_data, calculate_in_value, calculate_out_value, calculate_signature,
    decide_behaviour, detect_evil_miners, generate_first_round_of_new_term, generate_next_round,
    mark_next_round_producer, mark_next_term_producer, next_term_miners, reconstruct_in_value,
    replace_evil_miners, split_in_value, Behaviour, BlockContext, ConsensusCommand,
    ConsensusConfig, ConsensusError, ConsensusResult, ConsensusTransaction, DecisionContext, Hash,
    HeaderInformation, MinerKey, MinerList, Round, Timestamp, TriggerBehaviour, TriggerInformation,
    ValidationResult, TINY_BLOCKS_NUMBER,
};
use crate::events::ConsensusEvent;
use crate::metrics;
use crate::ports::{ConsensusApi, ElectionGateway, EventSink, InValueCipher, RoundStore};
use crate::state::ConsensusState;
use crate::validation::{HeaderValidator, ValidationFailure};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consensus Service
///
/// One instance per node. The cipher belongs to the local miner, so only
/// that miner can build update headers through this service.
pub struct ConsensusService<S, E, C, V>
where
    S: RoundStore,
    E: ElectionGateway,
    C: InValueCipher,
    V: EventSink,
{
    store: Arc<S>,
    election: Arc<E>,
    cipher: Arc<C>,
    event_sink: Arc<V>,
    state: Arc<ConsensusState>,
    config: ConsensusConfig,
}

/// Dependencies for ConsensusService
pub struct ConsensusDependencies<S, E, C, V> {
    pub store: Arc<S>,
    pub election: Arc<E>,
    pub cipher: Arc<C>,
    pub event_sink: Arc<V>,
    pub config: ConsensusConfig,
}

impl<S, E, C, V> ConsensusService<S, E, C, V>
where
    S: RoundStore,
    E: ElectionGateway,
    C: InValueCipher,
    V: EventSink,
{
    /// Create a new ConsensusService
    pub fn new(deps: ConsensusDependencies<S, E, C, V>) -> Self {
        Self {
            store: deps.store,
            election: deps.election,
            cipher: deps.cipher,
            event_sink: deps.event_sink,
            state: Arc::new(ConsensusState::new()),
            config: deps.config,
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Highest block height known to be irreversible.
    pub fn last_irreversible_height(&self) -> i64 {
        self.state.last_irreversible_height()
    }

    fn current_round_inner(&self) -> Option<Round> {
        match self.store.current_round_number() {
            0 => None,
            number => self.store.round(number),
        }
    }

    fn previous_round_inner(&self) -> Option<Round> {
        match self.store.current_round_number() {
            number if number > 1 => self.store.round(number - 1),
            _ => None,
        }
    }

    fn time_each_term_secs(&self) -> i64 {
        self.store
            .time_each_term_secs()
            .unwrap_or(self.config.time_each_term_secs)
    }

    fn publish(&self, event: ConsensusEvent) {
        let name = event.name();
        if let Err(e) = self.event_sink.publish(event) {
            warn!(event = name, error = %e, "Failed to publish consensus event");
        }
    }

    // === PRODUCER SIDE ===

    fn build_update_value(
        &self,
        current: &Round,
        pubkey: &str,
        random_hash: &Hash,
        previous_random_hash: Option<&Hash>,
        now: Timestamp,
    ) -> ConsensusResult<Round> {
        let previous = self
            .previous_round_inner()
            .filter(|p| p.term_number == current.term_number);

        let in_value = calculate_in_value(random_hash, current.round_id());
        let out_value = calculate_out_value(&in_value);
        let previous_in_value = match (previous.as_ref(), previous_random_hash) {
            (Some(prev), Some(prev_random)) => Some(calculate_in_value(prev_random, prev.round_id())),
            _ => None,
        };
        let signature = calculate_signature(&in_value, &out_value, random_hash, previous.as_ref());

        let mut round = current.clone();
        apply_normal_consensus_data(&mut round, pubkey, previous_in_value, out_value, signature)?;

        if round.miner_count() > 1 {
            let shares = split_in_value(&in_value, &round, pubkey, &mut rand::thread_rng())?;
            let mut sealed = BTreeMap::new();
            for (peer, share) in shares {
                let ciphertext = self.cipher.encrypt_message(&peer, &share)?;
                sealed.insert(peer, ciphertext);
            }
            if let Some(miner) = round.miner_mut(pubkey) {
                miner.encrypted_in_values = sealed;
            }
        }

        if let (Some(prev), Some(_)) = (previous.as_ref(), previous_random_hash) {
            self.reveal_previous_in_values(&mut round, prev, pubkey);
        }

        if let Some(miner) = round.miner_mut(pubkey) {
            miner.actual_mining_times.push(now);
            miner.produced_blocks += 1;
            miner.produced_tiny_blocks += 1;
            miner.promised_tiny_blocks = TINY_BLOCKS_NUMBER;
        }
        Ok(round)
    }

    /// Open the shares peers sealed for `me` last round and recover any
    /// previous in-value that now has enough shares.
    fn reveal_previous_in_values(&self, round: &mut Round, previous: &Round, me: &str) {
        for peer in previous.real_time_miners_information.values() {
            let Some(ciphertext) = peer.encrypted_in_values.get(me) else {
                continue;
            };
            match self.cipher.decrypt_message(&peer.pubkey, ciphertext) {
                Ok(share) => {
                    if let Some(target) = round.miner_mut(&peer.pubkey) {
                        target
                            .decrypted_previous_in_values
                            .insert(me.to_string(), share);
                    }
                }
                Err(e) => warn!(peer = %peer.pubkey, error = %e, "Cannot open in-value share"),
            }
        }

        let peers: Vec<MinerKey> = round
            .miner_keys()
            .into_iter()
            .filter(|k| k != me)
            .collect();
        for peer in peers {
            let Some(decrypted) = round
                .miner(&peer)
                .map(|m| m.decrypted_previous_in_values.clone())
            else {
                continue;
            };
            let recovered = match reconstruct_in_value(&decrypted, previous) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "In-value reconstruction failed");
                    continue;
                }
            };
            if let Some(target) = round.miner_mut(&peer) {
                if let Some(revealed) = target.previous_in_value.filter(|v| *v != recovered) {
                    warn!(
                        peer = %peer,
                        revealed = %revealed,
                        recovered = %recovered,
                        "Recovered in-value differs from the revealed one"
                    );
                }
                target.previous_in_value = Some(recovered);
            }
        }
    }

    fn build_tiny_block(&self, current: &Round, pubkey: &str, now: Timestamp) -> Round {
        let mut round = current.clone();
        if let Some(miner) = round.miner_mut(pubkey) {
            miner.actual_mining_times.push(now);
            miner.produced_blocks += 1;
            miner.produced_tiny_blocks += 1;
        }
        round
    }

    fn build_next_round(
        &self,
        current: &Round,
        pubkey: &str,
        now: Timestamp,
    ) -> ConsensusResult<Round> {
        let mut next = generate_next_round(current, now, self.store.blockchain_start_timestamp())?;

        let previous = self
            .previous_round_inner()
            .filter(|p| p.term_number == current.term_number);
        if let Some(previous) = previous {
            let evil = detect_evil_miners(current, &previous);
            if !evil.is_empty() {
                let snapshot = if current.term_number > 1 {
                    match self.election.get_term_snapshot(current.term_number - 1) {
                        Ok(snapshot) => Some(snapshot),
                        Err(e) => {
                            warn!(error = %e, "Cannot read previous term snapshot");
                            None
                        }
                    }
                } else {
                    None
                };
                let initial = self
                    .store
                    .round(1)
                    .map(|r| r.miner_keys())
                    .unwrap_or_default();
                let replaced = replace_evil_miners(
                    &mut next,
                    &evil,
                    snapshot.as_ref(),
                    &initial,
                    &current.miner_keys(),
                );
                for (evil, replacement) in replaced {
                    warn!(%evil, %replacement, round = next.round_number, "Replacing evil miner");
                }
            }
        }

        mark_next_round_producer(&mut next, pubkey, now);
        Ok(next)
    }

    fn build_next_term(
        &self,
        current: &Round,
        pubkey: &str,
        now: Timestamp,
    ) -> ConsensusResult<Round> {
        let victories = self.election.get_victories().unwrap_or_else(|e| {
            warn!(error = %e, "Cannot read election victories, keeping current miners");
            Vec::new()
        });
        let miners = next_term_miners(victories, current);
        let interval = self
            .store
            .mining_interval()
            .unwrap_or_else(|| current.mining_interval());

        let mut next = generate_first_round_of_new_term(
            &miners,
            interval,
            now,
            current.round_number,
            current.term_number,
        )?;
        next.blockchain_age = self
            .store
            .blockchain_start_timestamp()
            .map_or(0, |start| now.millis_since(start) / 1000);
        mark_next_term_producer(&mut next, pubkey, now);
        Ok(next)
    }

    fn validation_result(&self, checked: Result<(), ValidationFailure>) -> ValidationResult {
        match checked {
            Ok(()) => ValidationResult::ok(),
            Err(failure) => {
                metrics::record_validation_failure(failure.reason);
                debug!(reason = failure.reason, message = %failure.message, "Consensus header rejected");
                ValidationResult::fail(failure.to_string())
            }
        }
    }
}

impl<S, E, C, V> ConsensusApi for ConsensusService<S, E, C, V>
where
    S: RoundStore + 'static,
    E: ElectionGateway + 'static,
    C: InValueCipher + 'static,
    V: EventSink + 'static,
{
    fn initialize(&self, first_round: Round) -> ConsensusResult<()> {
        if self.store.current_round_number() != 0 {
            return Err(ConsensusError::AlreadyInitialized);
        }
        if first_round.round_number != 1 || first_round.term_number != 1 {
            return Err(ConsensusError::InvalidFirstRound(format!(
                "expected round 1 of term 1, got round {} of term {}",
                first_round.round_number, first_round.term_number
            )));
        }
        if first_round.is_empty() {
            return Err(ConsensusError::InvalidFirstRound("no miners".into()));
        }
        self.config.validate()?;

        let miners = first_round.miner_count();
        self.store.add_round(first_round)?;
        self.store.set_current_round_number(1);
        self.store.set_current_term_number(1);
        self.store.set_first_round_of_term(1, 1);
        self.store.set_mining_interval(self.config.mining_interval_ms);
        self.store
            .set_time_each_term_secs(self.config.time_each_term_secs);

        info!(miners, side_chain = self.config.is_side_chain(), "Consensus initialized");
        Ok(())
    }

    fn get_consensus_command(&self, pubkey: &str, now: Timestamp) -> ConsensusCommand {
        let Some(current) = self.current_round_inner() else {
            return ConsensusCommand::nothing();
        };
        let previous = self.previous_round_inner();

        let behaviour = decide_behaviour(&DecisionContext {
            current: Some(&current),
            previous: previous.as_ref(),
            now,
            pubkey,
            time_each_term_secs: self.time_each_term_secs(),
            blockchain_start: self.store.blockchain_start_timestamp(),
        });
        let command = crate::domain::get_consensus_command(
            behaviour,
            &current,
            previous.as_ref(),
            pubkey,
            now,
        );

        metrics::record_behaviour(command.hint.as_str());
        debug!(
            pubkey,
            round = current.round_number,
            behaviour = %command.hint,
            expected = %command.expected_mining_time,
            left_ms = command.next_block_mining_left_milliseconds,
            "Consensus command"
        );
        command
    }

    fn get_information_to_update_consensus(
        &self,
        trigger: &TriggerInformation,
        now: Timestamp,
    ) -> ConsensusResult<HeaderInformation> {
        let current = self
            .current_round_inner()
            .ok_or(ConsensusError::NotInitialized)?;
        let pubkey = trigger.pubkey.as_str();
        if !current.is_in_miner_list(pubkey) {
            return Err(ConsensusError::NotAMiner(trigger.pubkey.clone()));
        }

        let round = match &trigger.behaviour {
            TriggerBehaviour::UpdateValue {
                random_hash,
                previous_random_hash,
            } => self.build_update_value(
                &current,
                pubkey,
                random_hash,
                previous_random_hash.as_ref(),
                now,
            )?,
            TriggerBehaviour::UpdateValueWithoutPreviousInValue { random_hash } => {
                self.build_update_value(&current, pubkey, random_hash, None, now)?
            }
            TriggerBehaviour::TinyBlock => self.build_tiny_block(&current, pubkey, now),
            TriggerBehaviour::NextRound => self.build_next_round(&current, pubkey, now)?,
            TriggerBehaviour::NextTerm => self.build_next_term(&current, pubkey, now)?,
        };

        Ok(HeaderInformation {
            sender: trigger.pubkey.clone(),
            behaviour: trigger.behaviour.behaviour(),
            round,
        })
    }

    fn generate_consensus_transactions(
        &self,
        trigger: &TriggerInformation,
        now: Timestamp,
    ) -> ConsensusResult<Vec<ConsensusTransaction>> {
        let header = self.get_information_to_update_consensus(trigger, now)?;
        Ok(header.to_transaction()?.into_iter().collect())
    }

    fn validate_consensus_before_execution(&self, header: &HeaderInformation) -> ValidationResult {
        let current = self.current_round_inner();
        self.validation_result(HeaderValidator::validate_before_execution(
            header,
            current.as_ref(),
        ))
    }

    fn validate_consensus_after_execution(&self, header: &HeaderInformation) -> ValidationResult {
        let persisted = self.current_round_inner();
        self.validation_result(HeaderValidator::validate_after_execution(
            header,
            persisted.as_ref(),
        ))
    }

    fn execute(
        &self,
        transaction: &ConsensusTransaction,
        ctx: &BlockContext,
    ) -> ConsensusResult<()> {
        let current = self
            .current_round_inner()
            .ok_or(ConsensusError::NotInitialized)?;
        self.ensure_miner(&ctx.sender, &current)?;

        let behaviour = match transaction {
            ConsensusTransaction::UpdateValue(input) => {
                self.update_value(input, ctx, current)?;
                Behaviour::UpdateValue
            }
            ConsensusTransaction::UpdateTinyBlockInformation(input) => {
                self.update_tiny_block_information(input, ctx, current)?;
                Behaviour::TinyBlock
            }
            ConsensusTransaction::NextRound(round) => {
                self.next_round(round, ctx, &current)?;
                Behaviour::NextRound
            }
            ConsensusTransaction::NextTerm(round) => {
                self.next_term(round, ctx, &current)?;
                Behaviour::NextTerm
            }
        };

        self.after_execution(ctx, behaviour);
        Ok(())
    }

    fn current_round(&self) -> Option<Round> {
        self.current_round_inner()
    }

    fn previous_round(&self) -> Option<Round> {
        self.previous_round_inner()
    }

    fn round(&self, round_number: i64) -> Option<Round> {
        self.store.round(round_number)
    }

    fn current_miner_list(&self) -> Option<MinerList> {
        self.current_round_inner().map(|round| MinerList {
            round_number: round.round_number,
            pubkeys: round
                .ordered_miners()
                .into_iter()
                .map(|m| m.pubkey.clone())
                .collect(),
        })
    }

    fn current_term_number(&self) -> i64 {
        self.store.current_term_number()
    }

    fn lib_offset(&self) -> i64 {
        self.state.lib_offset().unwrap_or(0)
    }

    fn mined_miners(&self, round_number: i64) -> Option<Vec<MinerKey>> {
        self.store.mined_miners(round_number)
    }

    fn blockchain_start_timestamp(&self) -> Option<Timestamp> {
        self.store.blockchain_start_timestamp()
    }
}
