//! # Side chains
//!
//! A side chain runs one endless term: rounds only ever end with
//! `NextRound`, and the main-chain election is never asked for seats.

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use aedpos_consensus::{Behaviour, ConsensusApi, ConsensusConfig};
    use aedpos_node::{NodeConfig, Simulation, SimulationConfig};

    fn side_chain(miners: usize, rounds: i64) -> NodeConfig {
        NodeConfig {
            consensus: ConsensusConfig::side_chain(),
            simulation: SimulationConfig {
                miners,
                candidates: 0,
                rounds,
                ..SimulationConfig::default()
            },
        }
    }

    #[test]
    fn test_side_chain_never_changes_term() {
        let mut simulation = Simulation::new(side_chain(3, 4)).unwrap();
        let mut terminations = Vec::new();
        while simulation.current_round_number() <= 4 {
            let block = simulation.step().unwrap().unwrap();
            if matches!(block.behaviour, Behaviour::NextRound | Behaviour::NextTerm) {
                terminations.push(block.behaviour);
            }
        }

        assert_eq!(terminations, vec![Behaviour::NextRound; 4]);
        assert_eq!(simulation.current_term_number(), 1);
    }

    #[test]
    fn test_side_chain_skips_miner_count_updates() {
        let mut simulation = Simulation::new(side_chain(3, 2)).unwrap();
        simulation.run(&AtomicBool::new(false)).unwrap();

        let node = &simulation.nodes()[0];
        assert!(node.service.blockchain_start_timestamp().is_some());
        assert!(node.election.miners_counts().is_empty());
        assert!(node.election.snapshots_taken().is_empty());
    }
}
