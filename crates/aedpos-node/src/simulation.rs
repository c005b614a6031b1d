//! # In-process network simulation
//!
//! Every node owns a full consensus service with its own key, store and
//! election view. Each step asks all nodes for their consensus command,
//! lets the earliest one produce a block, and has every node validate and
//! execute it. After each block all nodes must hold the same round hash.

use crate::config::NodeConfig;
use aedpos_consensus::domain::TINY_BLOCKS_NUMBER;
use aedpos_consensus::{
    generate_genesis_round, Behaviour, BlockContext, ConsensusApi, ConsensusDependencies,
    ConsensusError, ConsensusService, Hash, InMemoryElection, InMemoryEventSink,
    InMemoryRoundStore, MinerKey, SealedBoxCipher, Timestamp, TriggerBehaviour,
    TriggerInformation,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shared_crypto::Secp256k1KeyPair;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub type NodeService =
    ConsensusService<InMemoryRoundStore, InMemoryElection, SealedBoxCipher, InMemoryEventSink>;

/// Simulation errors.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("Node {pubkey} rejected block {height} {stage} execution: {message}")]
    Rejected {
        pubkey: MinerKey,
        height: i64,
        stage: &'static str,
        message: String,
    },

    #[error("Nodes disagree on round {round_number} after block {height}")]
    Diverged { round_number: i64, height: i64 },

    #[error("No miner can produce after {steps} steps")]
    Stalled { steps: usize },
}

/// One simulated node.
pub struct Node {
    pub pubkey: MinerKey,
    pub service: NodeService,
    pub store: Arc<InMemoryRoundStore>,
    pub election: Arc<InMemoryElection>,
    pub events: Arc<InMemoryEventSink>,
}

impl Node {
    fn new(keypair: Secp256k1KeyPair, config: &NodeConfig) -> Self {
        let cipher = SealedBoxCipher::new(keypair);
        let pubkey = cipher.public_key_hex();
        let store = Arc::new(InMemoryRoundStore::new());
        let election = Arc::new(InMemoryElection::new());
        let events = Arc::new(InMemoryEventSink::new());
        let service = ConsensusService::new(ConsensusDependencies {
            store: store.clone(),
            election: election.clone(),
            cipher: Arc::new(cipher),
            event_sink: events.clone(),
            config: config.consensus.clone(),
        });
        Self {
            pubkey,
            service,
            store,
            election,
            events,
        }
    }
}

/// Summary printed when the simulation ends.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub blocks: i64,
    pub round_number: i64,
    pub term_number: i64,
    pub last_irreversible_height: i64,
    pub lib_offset: i64,
    pub evil_miners: Vec<MinerKey>,
    pub round_hash: String,
    pub miners: Vec<MinerKey>,
}

/// A block the simulation produced.
#[derive(Debug, Clone)]
pub struct ProducedBlock {
    pub height: i64,
    pub producer: MinerKey,
    pub behaviour: Behaviour,
    pub block_time: Timestamp,
}

pub struct Simulation {
    config: NodeConfig,
    nodes: Vec<Node>,
    initial_miners: Vec<MinerKey>,
    evil_miner: Option<MinerKey>,
    rng: StdRng,
    clock: Timestamp,
    height: i64,
    /// Round number and random hash each miner last committed with
    last_random: BTreeMap<MinerKey, (i64, Hash)>,
}

impl Simulation {
    /// Create the nodes and initialize all of them with one genesis round.
    pub fn new(config: NodeConfig) -> Result<Self, SimulationError> {
        let mut rng = StdRng::seed_from_u64(config.simulation.seed);
        let count = config.simulation.miners + config.simulation.candidates;
        let nodes: Vec<Node> = (0..count)
            .map(|_| Node::new(derive_keypair(&mut rng), &config))
            .collect();

        let initial_miners: Vec<MinerKey> = nodes
            .iter()
            .take(config.simulation.miners)
            .map(|n| n.pubkey.clone())
            .collect();
        let evil_miner = config
            .simulation
            .evil_miner
            .and_then(|i| initial_miners.get(i).cloned());

        let start = Timestamp::from_millis(config.simulation.start_time_ms);
        let genesis =
            generate_genesis_round(&initial_miners, config.consensus.mining_interval_ms, start)?;
        for node in &nodes {
            node.service.initialize(genesis.clone())?;
        }
        info!(
            miners = initial_miners.len(),
            candidates = config.simulation.candidates,
            "Simulation initialized"
        );

        Ok(Self {
            config,
            nodes,
            initial_miners,
            evil_miner,
            rng,
            clock: start,
            height: 0,
            last_random: BTreeMap::new(),
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, pubkey: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.pubkey == pubkey)
    }

    pub fn initial_miners(&self) -> &[MinerKey] {
        &self.initial_miners
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn clock(&self) -> Timestamp {
        self.clock
    }

    /// Produce one block. `None` when no node has anything to do.
    pub fn step(&mut self) -> Result<Option<ProducedBlock>, SimulationError> {
        let mut chosen: Option<(Timestamp, usize, Behaviour)> = None;
        for (index, node) in self.nodes.iter().enumerate() {
            let command = node.service.get_consensus_command(&node.pubkey, self.clock);
            if command.hint == Behaviour::Nothing || command.expected_mining_time == Timestamp::MAX
            {
                continue;
            }
            let earlier = chosen.map_or(true, |(time, best, _)| {
                (command.expected_mining_time, &node.pubkey) < (time, &self.nodes[best].pubkey)
            });
            if earlier {
                chosen = Some((command.expected_mining_time, index, command.hint));
            }
        }
        let Some((expected, index, hint)) = chosen else {
            return Ok(None);
        };

        let block_time = expected.max(self.clock.add_millis(1));
        let height = self.height + 1;
        let producer = self.nodes[index].pubkey.clone();
        let round_number = self.current_round_number();

        if hint == Behaviour::NextTerm {
            self.publish_victories();
        }
        let trigger = TriggerInformation {
            pubkey: producer.clone(),
            behaviour: self.trigger_behaviour(&producer, hint, round_number),
        };

        let header = self.nodes[index]
            .service
            .get_information_to_update_consensus(&trigger, block_time)?;
        let Some(transaction) = header.to_transaction()? else {
            return Ok(None);
        };
        let ctx = BlockContext {
            block_time,
            sender: producer.clone(),
            block_height: height,
        };

        for node in &self.nodes {
            let before = node.service.validate_consensus_before_execution(&header);
            if !before.success {
                return Err(SimulationError::Rejected {
                    pubkey: node.pubkey.clone(),
                    height,
                    stage: "before",
                    message: before.message,
                });
            }
            node.service.execute(&transaction, &ctx)?;
            let after = node.service.validate_consensus_after_execution(&header);
            if !after.success {
                return Err(SimulationError::Rejected {
                    pubkey: node.pubkey.clone(),
                    height,
                    stage: "after",
                    message: after.message,
                });
            }
        }
        self.check_agreement(height)?;

        self.clock = block_time;
        self.height = height;
        debug!(
            height,
            producer = %producer,
            behaviour = %header.behaviour,
            time = %block_time,
            "Block produced"
        );
        if matches!(header.behaviour, Behaviour::NextRound | Behaviour::NextTerm) {
            info!(
                round = self.current_round_number(),
                term = self.current_term_number(),
                height,
                "Entered new round"
            );
        }

        Ok(Some(ProducedBlock {
            height,
            producer,
            behaviour: header.behaviour,
            block_time,
        }))
    }

    /// Produce blocks until the configured number of rounds has completed
    /// or `stop` is raised.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<SimulationReport, SimulationError> {
        let target = self.config.simulation.rounds + 1;
        let per_round = (self.nodes.len() + 1) * (TINY_BLOCKS_NUMBER as usize + 2);
        let max_steps = per_round * (target as usize) * 2;

        let mut steps = 0;
        while self.current_round_number() < target {
            if stop.load(Ordering::SeqCst) {
                warn!(height = self.height, "Simulation stopped early");
                break;
            }
            if steps >= max_steps || self.step()?.is_none() {
                return Err(SimulationError::Stalled { steps });
            }
            steps += 1;
        }
        self.report()
    }

    pub fn report(&self) -> Result<SimulationReport, SimulationError> {
        let reference = &self.nodes[0];
        let round = reference
            .service
            .current_round()
            .ok_or(ConsensusError::NotInitialized)?;
        let miners = reference
            .service
            .current_miner_list()
            .map(|list| list.pubkeys)
            .unwrap_or_default();
        Ok(SimulationReport {
            blocks: self.height,
            round_number: round.round_number,
            term_number: round.term_number,
            last_irreversible_height: reference.service.last_irreversible_height(),
            lib_offset: reference.service.lib_offset(),
            evil_miners: reference.election.evil_miners(),
            round_hash: round.get_hash(true)?.to_hex(),
            miners,
        })
    }

    pub fn current_round_number(&self) -> i64 {
        self.nodes[0]
            .service
            .current_round()
            .map_or(0, |r| r.round_number)
    }

    pub fn current_term_number(&self) -> i64 {
        self.nodes[0].service.current_term_number()
    }

    fn trigger_behaviour(
        &mut self,
        producer: &str,
        hint: Behaviour,
        round_number: i64,
    ) -> TriggerBehaviour {
        match hint {
            Behaviour::UpdateValue | Behaviour::UpdateValueWithoutPreviousInValue => {
                let random_hash = self.random_hash();
                let previous_random_hash = self
                    .last_random
                    .get(producer)
                    .filter(|(round, _)| *round + 1 == round_number)
                    .map(|(_, hash)| *hash);
                self.last_random
                    .insert(producer.to_string(), (round_number, random_hash));

                if hint == Behaviour::UpdateValueWithoutPreviousInValue {
                    return TriggerBehaviour::UpdateValueWithoutPreviousInValue { random_hash };
                }
                let previous_random_hash = match previous_random_hash {
                    Some(_) if self.evil_miner.as_deref() == Some(producer) => {
                        Some(self.random_hash())
                    }
                    other => other,
                };
                TriggerBehaviour::UpdateValue {
                    random_hash,
                    previous_random_hash,
                }
            }
            Behaviour::NextTerm => TriggerBehaviour::NextTerm,
            Behaviour::NextRound => TriggerBehaviour::NextRound,
            Behaviour::TinyBlock | Behaviour::Nothing => TriggerBehaviour::TinyBlock,
        }
    }

    /// Elect the next term's miners: the node list rotated by term, without
    /// anyone flagged as evil.
    fn publish_victories(&self) {
        let seats = self.initial_miners.len();
        let shift = self.current_term_number().max(0) as usize;
        let evil = self.nodes[0].election.evil_miners();
        let honest: Vec<MinerKey> = self
            .nodes
            .iter()
            .map(|n| n.pubkey.clone())
            .filter(|k| !evil.contains(k))
            .collect();
        if honest.is_empty() {
            return;
        }
        let victories: Vec<MinerKey> = (0..seats.min(honest.len()))
            .map(|i| honest[(i + shift) % honest.len()].clone())
            .collect();
        for node in &self.nodes {
            node.election.set_victories(victories.clone());
        }
    }

    fn check_agreement(&self, height: i64) -> Result<(), SimulationError> {
        let mut expected: Option<Hash> = None;
        for node in &self.nodes {
            let round = node
                .service
                .current_round()
                .ok_or(ConsensusError::NotInitialized)?;
            let hash = round.get_hash(true)?;
            match expected {
                None => expected = Some(hash),
                Some(h) if h == hash => {}
                Some(_) => {
                    return Err(SimulationError::Diverged {
                        round_number: round.round_number,
                        height,
                    })
                }
            }
        }
        Ok(())
    }

    fn random_hash(&mut self) -> Hash {
        Hash::compute_from(self.rng.gen::<[u8; 32]>())
    }
}

/// Deterministic key pair from the simulation seed.
fn derive_keypair(rng: &mut StdRng) -> Secp256k1KeyPair {
    loop {
        // out-of-range scalars are astronomically rare; draw again
        if let Ok(keypair) = Secp256k1KeyPair::from_bytes(rng.gen()) {
            return keypair;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn small_config(miners: usize, rounds: i64) -> NodeConfig {
        NodeConfig {
            simulation: SimulationConfig {
                miners,
                candidates: 0,
                rounds,
                ..SimulationConfig::default()
            },
            ..NodeConfig::default()
        }
    }

    #[test]
    fn test_same_seed_same_keys() {
        let a = Simulation::new(small_config(3, 1)).unwrap();
        let b = Simulation::new(small_config(3, 1)).unwrap();
        assert_eq!(a.initial_miners(), b.initial_miners());
        assert_eq!(a.nodes().len(), 3);
        assert_eq!(a.current_round_number(), 1);
    }

    #[test]
    fn test_first_block_is_boot_update() {
        let mut sim = Simulation::new(small_config(3, 1)).unwrap();
        let block = sim.step().unwrap().unwrap();
        assert_eq!(block.height, 1);
        assert_eq!(block.behaviour, Behaviour::UpdateValueWithoutPreviousInValue);

        let round = sim.nodes()[0].service.current_round().unwrap();
        let boot = round.first_miner().unwrap();
        assert_eq!(boot.pubkey, block.producer);
        assert!(boot.out_value.is_some());
    }

    #[test]
    fn test_stop_flag_ends_run() {
        let mut sim = Simulation::new(small_config(3, 5)).unwrap();
        let stop = AtomicBool::new(true);
        let report = sim.run(&stop).unwrap();
        assert_eq!(report.blocks, 0);
        assert_eq!(report.round_number, 1);
    }
}
