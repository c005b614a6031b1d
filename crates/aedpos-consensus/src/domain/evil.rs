//! Evil miner detection and replacement.
//!
//! A miner is evil when the previous in-value it revealed does not hash to
//! the out-value it committed one round earlier.

use super::{calculate_out_value, MinerInRound, MinerKey, Round};
use std::collections::{BTreeMap, BTreeSet};

/// Miners of `current` whose revealed previous in-value contradicts `previous`.
///
/// Only meaningful within one term; across a term boundary nothing is
/// reported.
pub fn detect_evil_miners(current: &Round, previous: &Round) -> Vec<MinerKey> {
    if current.term_number != previous.term_number {
        return Vec::new();
    }
    current
        .real_time_miners_information
        .values()
        .filter(|miner| {
            let Some(revealed) = miner.previous_in_value else {
                return false;
            };
            previous
                .miner(&miner.pubkey)
                .and_then(|p| p.out_value)
                .map_or(false, |committed| calculate_out_value(&revealed) != committed)
        })
        .map(|miner| miner.pubkey.clone())
        .collect()
}

/// Replace each evil miner of `next` in place.
///
/// Candidates come first from the previous term's vote snapshot (most
/// votes first), then from initial miners that are not mining. Neither
/// source may hand out a sitting miner. Returns `(evil, replacement)` pairs.
pub fn replace_evil_miners(
    next: &mut Round,
    evil: &[MinerKey],
    previous_term_snapshot: Option<&BTreeMap<MinerKey, i64>>,
    initial_miners: &[MinerKey],
    current_miners: &[MinerKey],
) -> Vec<(MinerKey, MinerKey)> {
    let initial: BTreeSet<&str> = initial_miners.iter().map(String::as_str).collect();
    let mut excluded: BTreeSet<String> = current_miners.iter().cloned().collect();
    excluded.extend(next.miner_keys());

    let mut by_votes: Vec<(&MinerKey, i64)> = previous_term_snapshot
        .map(|snapshot| snapshot.iter().map(|(k, v)| (k, *v)).collect())
        .unwrap_or_default();
    by_votes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut replaced = Vec::new();
    for evil_key in evil {
        if !next.is_in_miner_list(evil_key) {
            continue;
        }
        let candidate = by_votes
            .iter()
            .map(|(k, _)| *k)
            .find(|k| !initial.contains(k.as_str()) && !excluded.contains(*k))
            .or_else(|| initial_miners.iter().find(|k| !excluded.contains(*k)))
            .cloned();
        let Some(candidate) = candidate else {
            break;
        };

        if let Some(slot) = next.real_time_miners_information.remove(evil_key) {
            let substitute = MinerInRound {
                pubkey: candidate.clone(),
                produced_blocks: 0,
                missed_time_slots: 0,
                ..slot
            };
            next.real_time_miners_information
                .insert(candidate.clone(), substitute);
        }
        excluded.insert(candidate.clone());
        replaced.push((evil_key.clone(), candidate));
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::super::testing::{key, mine, round_with};
    use super::super::Hash;
    use super::*;

    fn keys(n: u8) -> Vec<String> {
        (1..=n).map(key).collect()
    }

    #[test]
    fn test_detects_forged_reveal() {
        let all = keys(3);
        let mut previous = round_with(&all, 0, 4_000);
        let honest_in = Hash::compute_from(b"honest");
        previous.miner_mut(&all[0]).unwrap().out_value = Some(calculate_out_value(&honest_in));
        previous.miner_mut(&all[1]).unwrap().out_value =
            Some(calculate_out_value(&Hash::compute_from(b"real")));

        let mut current = round_with(&all, 20_000, 4_000);
        current.round_number = 2;
        current.miner_mut(&all[0]).unwrap().previous_in_value = Some(honest_in);
        current.miner_mut(&all[1]).unwrap().previous_in_value =
            Some(Hash::compute_from(b"forged"));

        assert_eq!(detect_evil_miners(&current, &previous), vec![all[1].clone()]);

        current.term_number = 2;
        assert!(detect_evil_miners(&current, &previous).is_empty());
    }

    #[test]
    fn test_replacement_prefers_snapshot_votes() {
        let all = keys(3);
        let initial = vec![all[0].clone(), all[1].clone(), all[2].clone(), key(9)];
        let mut next = round_with(&all, 0, 4_000);
        mine(&mut next, &all[1], 2);
        next.miner_mut(&all[1]).unwrap().produced_blocks = 7;

        let mut snapshot = BTreeMap::new();
        snapshot.insert(key(20), 10);
        snapshot.insert(key(21), 50);
        snapshot.insert(all[0].clone(), 99);

        let replaced =
            replace_evil_miners(&mut next, &[all[1].clone()], Some(&snapshot), &initial, &all);

        assert_eq!(replaced, vec![(all[1].clone(), key(21))]);
        assert!(!next.is_in_miner_list(&all[1]));
        let substitute = next.miner(&key(21)).unwrap();
        assert_eq!(substitute.order, 2);
        assert_eq!(substitute.produced_blocks, 0);
        assert_eq!(substitute.pubkey, key(21));
    }

    #[test]
    fn test_replacement_falls_back_to_initial_miner() {
        let all = keys(3);
        let initial = vec![all[0].clone(), key(9)];
        let mut next = round_with(&all, 0, 4_000);

        let replaced = replace_evil_miners(&mut next, &[all[2].clone()], None, &initial, &all);
        assert_eq!(replaced, vec![(all[2].clone(), key(9))]);
        assert_eq!(next.miner(&key(9)).unwrap().order, 3);
    }

    #[test]
    fn test_no_candidate_keeps_slot() {
        let all = keys(2);
        let mut next = round_with(&all, 0, 4_000);
        let before = next.clone();

        let replaced = replace_evil_miners(&mut next, &[all[0].clone()], None, &all, &all);
        assert!(replaced.is_empty());
        assert_eq!(next, before);
    }
}
