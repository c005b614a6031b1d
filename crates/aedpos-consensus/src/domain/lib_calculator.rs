//! Last irreversible block offset.
//!
//! A block is irreversible once `floor(2m/3) + 1` distinct miners have
//! committed after it. The current round is counted first; the previous
//! round tops the set up, walked from its last slot backwards.

use super::Round;
use std::collections::BTreeSet;

/// Distinct committers needed for irreversibility among `miner_count` miners.
pub fn lib_threshold(miner_count: usize) -> usize {
    miner_count * 2 / 3 + 1
}

/// Offset, in slots, of the last irreversible block; `None` means no advance.
pub fn calculate_lib_offset(current: &Round, previous: Option<&Round>) -> Option<i64> {
    let miner_count = current.miner_count();
    if miner_count == 0 {
        return None;
    }
    if miner_count == 1 {
        return Some(1);
    }

    let threshold = lib_threshold(miner_count);
    let mut committed: BTreeSet<&str> = current
        .mined_miners()
        .into_iter()
        .map(|m| m.pubkey.as_str())
        .collect();
    if committed.len() >= threshold {
        return Some(threshold as i64);
    }

    let previous = previous?;
    let mut walk = previous.ordered_miners();
    walk.reverse();
    for miner in walk {
        if miner.has_mined() {
            committed.insert(miner.pubkey.as_str());
            if committed.len() >= threshold {
                return Some(threshold as i64);
            }
        }
    }
    None
}
