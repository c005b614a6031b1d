//! # Consensus Metrics
//!
//! Prometheus metrics for monitoring round production.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! aedpos-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `aedpos_behaviours_total` - Counter of decided behaviours (by behaviour)
//! - `aedpos_rounds_advanced_total` - Counter of executed NextRound blocks
//! - `aedpos_terms_advanced_total` - Counter of executed NextTerm blocks
//! - `aedpos_validation_failures_total` - Counter of rejected headers (by reason)
//! - `aedpos_evil_miners_total` - Counter of evil miners detected
//! - `aedpos_lib_offset` - Gauge of the latest irreversible block offset

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Behaviours handed out by get_consensus_command
    pub static ref BEHAVIOURS: IntCounterVec = register_int_counter_vec!(
        "aedpos_behaviours_total",
        "Number of consensus behaviours decided",
        &["behaviour"]
    )
    .expect("Failed to create BEHAVIOURS metric");

    pub static ref ROUNDS_ADVANCED: IntCounter = register_int_counter!(
        "aedpos_rounds_advanced_total",
        "Number of rounds advanced"
    )
    .expect("Failed to create ROUNDS_ADVANCED metric");

    pub static ref TERMS_ADVANCED: IntCounter = register_int_counter!(
        "aedpos_terms_advanced_total",
        "Number of terms advanced"
    )
    .expect("Failed to create TERMS_ADVANCED metric");

    /// Rejected headers, labeled by rejection reason
    pub static ref VALIDATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "aedpos_validation_failures_total",
        "Number of consensus headers rejected",
        &["reason"]
    )
    .expect("Failed to create VALIDATION_FAILURES metric");

    pub static ref EVIL_MINERS: IntCounter = register_int_counter!(
        "aedpos_evil_miners_total",
        "Number of evil miners detected"
    )
    .expect("Failed to create EVIL_MINERS metric");

    pub static ref LIB_OFFSET: IntGauge = register_int_gauge!(
        "aedpos_lib_offset",
        "Latest last irreversible block offset, in rounds"
    )
    .expect("Failed to create LIB_OFFSET metric");
}

#[cfg(feature = "metrics")]
pub fn record_behaviour(behaviour: &str) {
    BEHAVIOURS.with_label_values(&[behaviour]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_round_advanced() {
    ROUNDS_ADVANCED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_term_advanced() {
    TERMS_ADVANCED.inc();
}

/// Record a rejected header with reason
#[cfg(feature = "metrics")]
pub fn record_validation_failure(reason: &str) {
    VALIDATION_FAILURES.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_evil_miner() {
    EVIL_MINERS.inc();
}

#[cfg(feature = "metrics")]
pub fn set_lib_offset(offset: i64) {
    LIB_OFFSET.set(offset);
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_behaviour(_behaviour: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_advanced() {}

#[cfg(not(feature = "metrics"))]
pub fn record_term_advanced() {}

#[cfg(not(feature = "metrics"))]
pub fn record_validation_failure(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_evil_miner() {}

#[cfg(not(feature = "metrics"))]
pub fn set_lib_offset(_offset: i64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_behaviour("UpdateValue");
        record_round_advanced();
        record_term_advanced();
        record_validation_failure("test");
        record_evil_miner();
        set_lib_offset(3);
    }
}
