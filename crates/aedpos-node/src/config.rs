//! # Node Configuration
//!
//! Consensus parameters plus the shape of the simulated network.
//!
//! Sources, later ones win:
//! 1. Built-in defaults (a short term length so terms actually change)
//! 2. JSON file named by `AEDPOS_CONFIG`
//! 3. `AEDPOS_*` environment variables

use aedpos_consensus::ConsensusConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Term length used when nothing else is configured (seconds).
pub const DEVNET_TIME_EACH_TERM_SECS: i64 = 120;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Consensus configuration.
    pub consensus: ConsensusConfig,
    /// Simulated network.
    pub simulation: SimulationConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            consensus: ConsensusConfig {
                time_each_term_secs: DEVNET_TIME_EACH_TERM_SECS,
                ..ConsensusConfig::default()
            },
            simulation: SimulationConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.consensus
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.simulation.validate()
    }
}

/// Simulated network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Miners of the first round.
    pub miners: usize,
    /// Extra nodes that only mine once elected.
    pub candidates: usize,
    /// Stop once this many rounds have completed.
    pub rounds: i64,
    /// Time of the genesis round (milliseconds).
    pub start_time_ms: i64,
    /// Seed for keys and random hashes.
    pub seed: u64,
    /// Index of an initial miner that forges its revealed in-values.
    pub evil_miner: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            miners: 5,
            candidates: 2,
            rounds: 12,
            start_time_ms: 0,
            seed: 42,
            evil_miner: None,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.miners == 0 {
            return Err(ConfigError::Invalid("at least one miner is required".into()));
        }
        if self.rounds <= 0 {
            return Err(ConfigError::Invalid(format!(
                "rounds must be positive, got {}",
                self.rounds
            )));
        }
        if let Some(index) = self.evil_miner {
            if index >= self.miners {
                return Err(ConfigError::Invalid(format!(
                    "evil_miner {index} is not one of {} miners",
                    self.miners
                )));
            }
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from `AEDPOS_CONFIG` and the environment.
pub fn load_config() -> Result<NodeConfig, ConfigError> {
    let config = match std::env::var("AEDPOS_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration file");
            load_file(Path::new(&path))?
        }
        Err(_) => NodeConfig::default(),
    };

    let config = apply_overrides(config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

pub fn load_file(path: &Path) -> Result<NodeConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Apply `AEDPOS_*` overrides read through `lookup`.
pub fn apply_overrides<F>(mut config: NodeConfig, lookup: F) -> Result<NodeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = parsed(&lookup, "AEDPOS_MINERS")? {
        config.simulation.miners = value;
    }
    if let Some(value) = parsed(&lookup, "AEDPOS_ROUNDS")? {
        config.simulation.rounds = value;
    }
    if let Some(value) = parsed(&lookup, "AEDPOS_SEED")? {
        config.simulation.seed = value;
    }
    if let Some(value) = parsed(&lookup, "AEDPOS_EVIL_MINER")? {
        config.simulation.evil_miner = Some(value);
    }
    if let Some(value) = parsed(&lookup, "AEDPOS_MINING_INTERVAL_MS")? {
        config.consensus.mining_interval_ms = value;
    }
    if let Some(value) = parsed(&lookup, "AEDPOS_TIME_EACH_TERM_SECS")? {
        config.consensus.time_each_term_secs = value;
    }
    Ok(config)
}

fn parsed<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}
