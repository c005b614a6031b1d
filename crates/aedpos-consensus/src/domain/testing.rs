//! Round fixtures shared by the domain unit tests.

use super::{Hash, MinerInRound, Round, Timestamp};

/// 33-byte hex key whose first byte is `first_byte`.
pub(crate) fn key(first_byte: u8) -> String {
    format!("{:02x}{}", first_byte, "ab".repeat(32))
}

/// Round whose miner `i` (0-based) has order `i + 1` at `start + order * interval`.
pub(crate) fn round_with(keys: &[String], start: i64, interval: i64) -> Round {
    let mut round = Round::new(1, 1);
    for (i, key) in keys.iter().enumerate() {
        let order = i as i64 + 1;
        let mut miner = MinerInRound::new(
            key.clone(),
            order,
            Timestamp::from_millis(start + order * interval),
        );
        miner.is_extra_block_producer = order == 1;
        round.real_time_miners_information.insert(key.clone(), miner);
    }
    round
}

/// Mark `pubkey` as mined with a deterministic out-value and signature.
pub(crate) fn mine(round: &mut Round, pubkey: &str, final_order: i64) {
    if let Some(miner) = round.miner_mut(pubkey) {
        let seed = Hash::compute_from(pubkey.as_bytes());
        miner.out_value = Some(Hash::compute_from(seed.as_bytes()));
        miner.signature = Some(Hash::concat_and_compute(&seed, &seed));
        miner.supposed_order_of_next_round = final_order;
        miner.final_order_of_next_round = final_order;
    }
}
