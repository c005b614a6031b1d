//! Consensus configuration.

use super::{
    ConsensusError, ConsensusResult, DEFAULT_MINERS_INCREASE_PER_YEAR, DEFAULT_MINING_INTERVAL_MS,
    DEFAULT_TIME_EACH_TERM_SECS,
};
use serde::{Deserialize, Serialize};

/// Consensus configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Length of one time slot (milliseconds)
    pub mining_interval_ms: i64,
    /// Length of a term (seconds). `i64::MAX` disables term changes.
    pub time_each_term_secs: i64,
    /// Extra miner seats added for each year since chain start
    pub miners_increase_per_year: i64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            mining_interval_ms: DEFAULT_MINING_INTERVAL_MS,
            time_each_term_secs: DEFAULT_TIME_EACH_TERM_SECS,
            miners_increase_per_year: DEFAULT_MINERS_INCREASE_PER_YEAR,
        }
    }
}

impl ConsensusConfig {
    /// Side chains run a single endless term.
    pub fn side_chain() -> Self {
        Self {
            time_each_term_secs: i64::MAX,
            ..Self::default()
        }
    }

    pub fn is_side_chain(&self) -> bool {
        self.time_each_term_secs == i64::MAX
    }

    pub fn validate(&self) -> ConsensusResult<()> {
        if self.mining_interval_ms <= 0 {
            return Err(ConsensusError::InvalidConfig(format!(
                "mining_interval_ms must be positive, got {}",
                self.mining_interval_ms
            )));
        }
        if self.time_each_term_secs <= 0 {
            return Err(ConsensusError::InvalidConfig(format!(
                "time_each_term_secs must be positive, got {}",
                self.time_each_term_secs
            )));
        }
        if self.miners_increase_per_year < 0 {
            return Err(ConsensusError::InvalidConfig(
                "miners_increase_per_year must not be negative".into(),
            ));
        }
        Ok(())
    }
}
