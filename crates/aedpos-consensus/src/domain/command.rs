//! Consensus command: when to mine next and how long a block may take.

use super::{
    Behaviour, Round, Timestamp, LIMIT_BLOCK_EXECUTION_TIME_TOTAL_WEIGHT,
    LIMIT_BLOCK_EXECUTION_TIME_WEIGHT, TINY_BLOCKS_NUMBER, TOTAL_TINY_SLOTS,
};
use serde::{Deserialize, Serialize};

/// Scheduling answer handed to the block producer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusCommand {
    pub expected_mining_time: Timestamp,
    /// Milliseconds from the query time until `expected_mining_time`, at least 0
    pub next_block_mining_left_milliseconds: i64,
    pub limit_milliseconds_of_mining_block: i64,
    pub hint: Behaviour,
}

impl ConsensusCommand {
    pub fn nothing() -> Self {
        Self {
            expected_mining_time: Timestamp::MAX,
            next_block_mining_left_milliseconds: i64::MAX,
            limit_milliseconds_of_mining_block: 0,
            hint: Behaviour::Nothing,
        }
    }
}

/// Turn a decided behaviour into a command for `pubkey`.
pub fn get_consensus_command(
    behaviour: Behaviour,
    current: &Round,
    previous: Option<&Round>,
    pubkey: &str,
    now: Timestamp,
) -> ConsensusCommand {
    let Some(miner) = current.miner(pubkey) else {
        return ConsensusCommand::nothing();
    };

    let alone = is_lonely_miner(previous, pubkey);
    let behaviour = if behaviour == Behaviour::TinyBlock && alone && current.miner_count() > 2 {
        Behaviour::Nothing
    } else {
        behaviour
    };

    let interval = current.mining_interval();
    let boot_pending = current
        .first_miner()
        .map_or(true, |m| m.out_value.is_none());

    let (behaviour, expected) = match behaviour {
        Behaviour::Nothing => return ConsensusCommand::nothing(),
        Behaviour::UpdateValueWithoutPreviousInValue
            if current.round_number == 1 && boot_pending =>
        {
            (behaviour, now.add_millis(miner.order.saturating_mul(interval)))
        }
        Behaviour::UpdateValueWithoutPreviousInValue | Behaviour::UpdateValue => {
            (behaviour, miner.expected_mining_time)
        }
        Behaviour::TinyBlock => match tiny_block_mining_time(current, previous, pubkey, now) {
            Some(expected) => (behaviour, expected),
            None => (Behaviour::NextRound, next_round_mining_time(current, pubkey, now)),
        },
        Behaviour::NextRound => (behaviour, next_round_mining_time(current, pubkey, now)),
        Behaviour::NextTerm => (behaviour, current.arrange_abnormal_mining_time(pubkey, now)),
    };
    if expected == Timestamp::MAX {
        return ConsensusCommand {
            hint: behaviour,
            ..ConsensusCommand::nothing()
        };
    }

    let left = expected.millis_since(now);
    let limit = if behaviour == Behaviour::NextTerm {
        interval / 2
    } else if alone {
        interval
    } else {
        let blocks_before_start = blocks_before_round_start(current, pubkey);
        let base = (interval / TOTAL_TINY_SLOTS + left.min(0)).max(0);
        let tiny = miner.produced_tiny_blocks;
        if tiny == TINY_BLOCKS_NUMBER || tiny == TINY_BLOCKS_NUMBER + blocks_before_start {
            base / 2
        } else {
            base * LIMIT_BLOCK_EXECUTION_TIME_WEIGHT / LIMIT_BLOCK_EXECUTION_TIME_TOTAL_WEIGHT
        }
    };

    ConsensusCommand {
        expected_mining_time: expected,
        next_block_mining_left_milliseconds: left.max(0),
        limit_milliseconds_of_mining_block: limit,
        hint: behaviour,
    }
}

/// The only miner that produced in the previous round.
fn is_lonely_miner(previous: Option<&Round>, pubkey: &str) -> bool {
    previous.map_or(false, |previous| {
        let mined = previous.mined_miners();
        mined.len() == 1 && mined[0].pubkey == pubkey
    })
}

/// Blocks this miner produced in the round before its start time.
fn blocks_before_round_start(current: &Round, pubkey: &str) -> i64 {
    let start = current.start_time();
    current.miner(pubkey).map_or(0, |m| {
        m.actual_mining_times.iter().filter(|t| **t < start).count() as i64
    })
}

fn next_round_mining_time(current: &Round, pubkey: &str, now: Timestamp) -> Timestamp {
    match current.miner(pubkey) {
        Some(miner) if current.round_number == 1 && miner.order != 1 => {
            let n = current.miner_count() as i64;
            now.add_millis((miner.order + n).saturating_mul(current.mining_interval()))
        }
        _ => current.arrange_abnormal_mining_time(pubkey, now),
    }
}

/// Next free tiny-block sub-slot, `None` once the window is exhausted.
fn tiny_block_mining_time(
    current: &Round,
    previous: Option<&Round>,
    pubkey: &str,
    now: Timestamp,
) -> Option<Timestamp> {
    let miner = current.miner(pubkey)?;
    let interval = current.mining_interval();
    let each = interval / TOTAL_TINY_SLOTS;
    let tiny = miner.produced_tiny_blocks;

    let origin = if current.round_number == 1 {
        miner
            .actual_mining_times
            .first()
            .copied()
            .unwrap_or(miner.expected_mining_time)
    } else if miner.out_value.is_some() {
        miner.expected_mining_time
    } else if previous.is_some() {
        current.start_time().add_millis(-interval)
    } else {
        miner.expected_mining_time
    };

    let step = if current.round_number != 1
        && miner.out_value.is_some()
        && current.extra_block_producer_of_previous_round.as_deref() == Some(pubkey)
    {
        tiny - blocks_before_round_start(current, pubkey)
    } else {
        tiny
    };

    let window_end = origin.add_millis(interval);
    let mut expected = origin.add_millis(step.max(0).saturating_mul(each));
    while expected < now && expected < window_end && each > 0 {
        expected = expected.add_millis(each);
    }

    if expected.millis_since(now) < 0 {
        None
    } else {
        Some(expected)
    }
}
