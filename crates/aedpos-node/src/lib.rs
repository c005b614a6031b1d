//! # AEDPoS Node Library
//!
//! Exposes the node's modules for the binary and for integration tests.
//!
//! - `config` - configuration from defaults, a JSON file and the environment
//! - `simulation` - a set of in-process nodes driving the consensus core

pub mod config;
pub mod simulation;

pub use config::{load_config, ConfigError, NodeConfig, SimulationConfig};
pub use simulation::{Node, ProducedBlock, Simulation, SimulationError, SimulationReport};
