//! Round and term transitions.

use super::{
    ConsensusError, ConsensusResult, Hash, MinerInRound, MinerKey, Round, Timestamp,
    MAX_MINERS_COUNT,
};
use std::collections::{BTreeMap, BTreeSet};

/// Record a miner's commitment and claim its order in the next round.
///
/// The order is `|signature mod N| + 1`. A miner already holding that
/// order is pushed to the next free one, wrapping past `N`.
pub fn apply_normal_consensus_data(
    round: &mut Round,
    pubkey: &str,
    previous_in_value: Option<Hash>,
    out_value: Hash,
    signature: Hash,
) -> ConsensusResult<()> {
    if !round.is_in_miner_list(pubkey) {
        return Err(ConsensusError::NotAMiner(pubkey.to_string()));
    }
    let n = round.miner_count() as i64;
    let supposed = (signature.to_i64() % n).abs() + 1;

    let conflicts: Vec<MinerKey> = round
        .real_time_miners_information
        .values()
        .filter(|m| m.pubkey != pubkey && m.final_order_of_next_round == supposed)
        .map(|m| m.pubkey.clone())
        .collect();
    for conflict in conflicts {
        let free = (supposed + 1..n * 2)
            .map(|i| if i > n { i % n } else { i })
            .find(|candidate| {
                round
                    .real_time_miners_information
                    .values()
                    .all(|m| m.final_order_of_next_round != *candidate)
            });
        if let (Some(order), Some(miner)) = (free, round.miner_mut(&conflict)) {
            miner.final_order_of_next_round = order;
        }
    }

    if let Some(miner) = round.miner_mut(pubkey) {
        if previous_in_value.is_some() {
            miner.previous_in_value = previous_in_value;
        }
        miner.out_value = Some(out_value);
        miner.signature = Some(signature);
        miner.supposed_order_of_next_round = supposed;
        miner.final_order_of_next_round = supposed;
    }
    Ok(())
}

/// Apply next-round orders tuned by the producer, then reconcile.
///
/// Every tuned miner must exist, hold an out-value and get an order in
/// `1..=N`; otherwise nothing is changed.
pub fn apply_tuned_orders(round: &mut Round, tunes: &BTreeMap<MinerKey, i64>) -> ConsensusResult<()> {
    let n = round.miner_count() as i64;
    for (pubkey, order) in tunes {
        let miner = round
            .miner(pubkey)
            .ok_or_else(|| ConsensusError::NotAMiner(pubkey.clone()))?;
        if miner.out_value.is_none() {
            return Err(ConsensusError::TuneWithoutOutValue(pubkey.clone()));
        }
        if *order < 1 || *order > n {
            return Err(ConsensusError::InvalidOrder {
                pubkey: pubkey.clone(),
                order: *order,
                miners: n as usize,
            });
        }
    }

    for (pubkey, order) in tunes {
        if let Some(miner) = round.miner_mut(pubkey) {
            miner.final_order_of_next_round = *order;
        }
    }
    reconcile_final_orders(round);
    Ok(())
}

/// Make the nonzero final orders distinct.
///
/// Claimants are visited by `(order, tuned away from supposed, pubkey)`.
/// The first keeps its order, later ones take the next free order forward,
/// wrapping past `N`.
pub fn reconcile_final_orders(round: &mut Round) {
    let n = round.miner_count() as i64;
    let mut claimants: Vec<(i64, bool, MinerKey)> = round
        .real_time_miners_information
        .values()
        .filter(|m| m.final_order_of_next_round != 0)
        .map(|m| {
            (
                m.final_order_of_next_round,
                m.final_order_of_next_round != m.supposed_order_of_next_round,
                m.pubkey.clone(),
            )
        })
        .collect();
    claimants.sort();

    let mut taken = BTreeSet::new();
    for (order, _, pubkey) in claimants {
        let assigned = (0..n)
            .map(|step| (order - 1 + step).rem_euclid(n) + 1)
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or(order);
        taken.insert(assigned);
        if assigned != order {
            if let Some(miner) = round.miner_mut(&pubkey) {
                miner.final_order_of_next_round = assigned;
            }
        }
    }
}

/// Lay out the next round of the same term.
///
/// Miners that produced take the order they claimed; the rest fill the
/// remaining orders in their current sequence and are charged a missed slot.
pub fn generate_next_round(
    current: &Round,
    now: Timestamp,
    blockchain_start: Option<Timestamp>,
) -> ConsensusResult<Round> {
    let interval = current.mining_interval();
    let n = current.miner_count() as i64;
    let mut next = Round::new(current.round_number + 1, current.term_number);

    let mut mined: Vec<&MinerInRound> = current
        .real_time_miners_information
        .values()
        .filter(|m| m.final_order_of_next_round != 0)
        .collect();
    mined.sort_by_key(|m| m.final_order_of_next_round);

    let mut taken = BTreeSet::new();
    for miner in mined {
        let order = miner.final_order_of_next_round;
        if order < 1 || order > n || !taken.insert(order) {
            return Err(ConsensusError::InvalidOrder {
                pubkey: miner.pubkey.clone(),
                order,
                miners: n as usize,
            });
        }
        next.real_time_miners_information
            .insert(miner.pubkey.clone(), carry_over(miner, order, now, interval, 0));
    }

    let mut free_orders = (1..=n).filter(|order| !taken.contains(order));
    for miner in current.ordered_miners() {
        if miner.final_order_of_next_round != 0 {
            continue;
        }
        let Some(order) = free_orders.next() else {
            return Err(ConsensusError::InvalidOrder {
                pubkey: miner.pubkey.clone(),
                order: 0,
                miners: n as usize,
            });
        };
        next.real_time_miners_information
            .insert(miner.pubkey.clone(), carry_over(miner, order, now, interval, 1));
    }

    let extra_order = next_extra_block_producer_order(current);
    for miner in next.real_time_miners_information.values_mut() {
        miner.is_extra_block_producer = miner.order == extra_order;
    }

    next.blockchain_age = blockchain_start.map_or(0, |start| now.millis_since(start) / 1000);
    Ok(next)
}

fn carry_over(
    miner: &MinerInRound,
    order: i64,
    now: Timestamp,
    interval: i64,
    missed: i64,
) -> MinerInRound {
    MinerInRound {
        produced_blocks: miner.produced_blocks,
        missed_time_slots: miner.missed_time_slots + missed,
        ..MinerInRound::new(
            miner.pubkey.clone(),
            order,
            now.add_millis(order.saturating_mul(interval)),
        )
    }
}

/// Order of the next round's extra block producer.
fn next_extra_block_producer_order(current: &Round) -> i64 {
    let n = current.miner_count() as i64;
    current
        .ordered_miners()
        .into_iter()
        .find_map(|m| m.signature)
        .map_or(1, |signature| (signature.to_i64() % n).abs() + 1)
}

/// Bookkeeping for the miner producing the transition block.
pub fn mark_next_round_producer(next: &mut Round, sender: &str, now: Timestamp) {
    if let Some(miner) = next.miner_mut(sender) {
        miner.produced_blocks += 1;
        miner.produced_tiny_blocks = 1;
        miner.actual_mining_times.push(now);
    }
    next.extra_block_producer_of_previous_round = Some(sender.to_string());
}

/// Same as [`mark_next_round_producer`] for the first round of a term,
/// where block counters start over.
pub fn mark_next_term_producer(next: &mut Round, sender: &str, now: Timestamp) {
    if let Some(miner) = next.miner_mut(sender) {
        miner.produced_blocks = 1;
        miner.produced_tiny_blocks = 1;
        miner.actual_mining_times.push(now);
    }
    next.extra_block_producer_of_previous_round = Some(sender.to_string());
}

/// First round of the term after `term_number`.
///
/// Miners are ordered by the first byte of their key, descending, ties by
/// key; the order-1 miner owns the extra block slot.
pub fn generate_first_round_of_new_term(
    miners: &[MinerKey],
    mining_interval: i64,
    now: Timestamp,
    round_number: i64,
    term_number: i64,
) -> ConsensusResult<Round> {
    if miners.is_empty() {
        return Err(ConsensusError::EmptyMinerList);
    }

    let mut sorted = Vec::with_capacity(miners.len());
    for pubkey in miners {
        let first_byte = hex::decode(pubkey.get(..2).unwrap_or_default())
            .ok()
            .and_then(|bytes| bytes.first().copied())
            .ok_or_else(|| ConsensusError::InvalidPublicKey(pubkey.clone()))?;
        sorted.push((first_byte, pubkey));
    }
    sorted.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    sorted.dedup_by(|a, b| a.1 == b.1);
    if sorted.len() > MAX_MINERS_COUNT {
        return Err(ConsensusError::TooManyMiners {
            count: sorted.len(),
            max: MAX_MINERS_COUNT,
        });
    }

    let mut round = Round::new(round_number + 1, term_number + 1);
    for (i, (_, pubkey)) in sorted.into_iter().enumerate() {
        let order = i as i64 + 1;
        let mut miner = MinerInRound::new(
            pubkey.clone(),
            order,
            now.add_millis(order.saturating_mul(mining_interval)),
        );
        miner.is_extra_block_producer = order == 1;
        round.real_time_miners_information.insert(pubkey.clone(), miner);
    }
    Ok(round)
}

/// Round 1 of term 1, laid out from `start`.
pub fn generate_genesis_round(
    miners: &[MinerKey],
    mining_interval: i64,
    start: Timestamp,
) -> ConsensusResult<Round> {
    generate_first_round_of_new_term(miners, mining_interval, start, 0, 0)
}
