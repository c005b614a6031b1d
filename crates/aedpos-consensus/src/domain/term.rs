//! Term boundaries and miner-count growth.

use super::{MinerKey, Round, Timestamp, SECONDS_PER_YEAR};

/// Term index (0-based) that a block at `block_time` falls into.
pub fn term_index(blockchain_start: Timestamp, block_time: Timestamp, time_each_term_secs: i64) -> i64 {
    if time_each_term_secs <= 0 {
        return 0;
    }
    (block_time.millis_since(blockchain_start) / 1000) / time_each_term_secs
}

/// Whether enough miners have already produced inside the next term period.
///
/// A miner approves when its latest block falls outside term
/// `current_term`; the term changes once `floor(2M/3) + 1` miners approve,
/// `M` being the number of miners that produced in the previous round.
pub fn is_time_to_change_term(
    current: &Round,
    previous: Option<&Round>,
    blockchain_start: Timestamp,
    current_term: i64,
    time_each_term_secs: i64,
) -> bool {
    let mined_previously = previous.map_or(0, Round::out_value_count);
    let consent = mined_previously * 2 / 3 + 1;

    let approvals = current
        .real_time_miners_information
        .values()
        .filter_map(|m| m.actual_mining_times.last())
        .filter(|t| term_index(blockchain_start, **t, time_each_term_secs) != current_term - 1)
        .count();

    approvals >= consent
}

/// Miner seats granted after the chain has run from `blockchain_start` to `now`.
pub fn miners_count_at(
    initial_miners: usize,
    blockchain_start: Timestamp,
    now: Timestamp,
    increase_per_year: i64,
) -> i64 {
    let years = (now.millis_since(blockchain_start) / 1000 / SECONDS_PER_YEAR).max(0);
    initial_miners as i64 + increase_per_year.saturating_mul(years)
}

/// Election winners, or the sitting miners when the election has none.
pub fn next_term_miners(victories: Vec<MinerKey>, current: &Round) -> Vec<MinerKey> {
    if victories.is_empty() {
        current.miner_keys()
    } else {
        victories
    }
}
