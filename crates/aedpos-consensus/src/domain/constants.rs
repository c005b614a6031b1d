//! Protocol constants.

/// Tiny blocks a miner may produce in its own time slot.
pub const TINY_BLOCKS_NUMBER: i64 = 8;

/// A time slot is divided into this many sub-slots for tiny blocks.
pub const TOTAL_TINY_SLOTS: i64 = 9;

/// Share of a sub-slot granted to block execution (numerator).
pub const LIMIT_BLOCK_EXECUTION_TIME_WEIGHT: i64 = 3;

/// Share of a sub-slot granted to block execution (denominator).
pub const LIMIT_BLOCK_EXECUTION_TIME_TOTAL_WEIGHT: i64 = 5;

/// In-value shares are points on a GF(2^8) polynomial, one x-coordinate per order.
pub const MAX_MINERS_COUNT: usize = 255;

/// Mining interval assumed when a round has fewer than two miners.
pub const SINGLE_MINER_MINING_INTERVAL_MS: i64 = 1000;

pub const DEFAULT_MINING_INTERVAL_MS: i64 = 4000;

/// One week.
pub const DEFAULT_TIME_EACH_TERM_SECS: i64 = 604_800;

pub const DEFAULT_MINERS_INCREASE_PER_YEAR: i64 = 2;

pub const SECONDS_PER_YEAR: i64 = 31_536_000;
