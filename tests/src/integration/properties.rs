//! # Round properties
//!
//! proptest checks over the pure round arithmetic that every node relies
//! on agreeing about.

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use aedpos_consensus::domain::{
        calculate_lib_offset, lib_threshold, reconcile_final_orders, reconstruct_in_value,
        split_in_value,
    };
    use aedpos_consensus::{generate_genesis_round, Hash, MinerKey, Round, Timestamp};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Compressed-key shaped hex; the first byte decides genesis order.
    fn keys(n: usize) -> Vec<MinerKey> {
        (0..n).map(|i| format!("{:02x}{}", i, "ab".repeat(32))).collect()
    }

    fn genesis(n: usize) -> Round {
        generate_genesis_round(&keys(n), 4_000, Timestamp::from_millis(0)).unwrap()
    }

    proptest! {
        #[test]
        fn prop_genesis_slots_are_valid(n in 1usize..20, interval in 100i64..10_000) {
            let round = generate_genesis_round(&keys(n), interval, Timestamp::from_millis(0)).unwrap();
            let highest_first = round.ordered_miners().first().map(|m| m.pubkey.clone());
            prop_assert_eq!(highest_first, keys(n).last().cloned());
            let orders: BTreeSet<i64> = round.real_time_miners_information.values().map(|m| m.order).collect();
            prop_assert_eq!(orders, (1..=n as i64).collect::<BTreeSet<_>>());
            prop_assert!(round.check_time_slots().is_ok());
            prop_assert_eq!(round.round_id(), round.clone().round_id());
        }

        #[test]
        fn prop_reconciled_orders_are_distinct(claims in proptest::collection::vec(1i64..=8, 2..=8)) {
            let n = claims.len();
            let mut round = genesis(n);
            for (pubkey, claim) in keys(n).iter().zip(&claims) {
                let miner = round.miner_mut(pubkey).unwrap();
                miner.out_value = Some(Hash::compute_from(pubkey.as_bytes()));
                miner.supposed_order_of_next_round = (*claim - 1) % n as i64 + 1;
                miner.final_order_of_next_round = miner.supposed_order_of_next_round;
            }

            reconcile_final_orders(&mut round);

            let finals: BTreeSet<i64> = round
                .real_time_miners_information
                .values()
                .map(|m| m.final_order_of_next_round)
                .collect();
            prop_assert_eq!(finals, (1..=n as i64).collect::<BTreeSet<_>>());
        }

        #[test]
        fn prop_threshold_of_shares_recovers_in_value(
            n in 2usize..10,
            seed in any::<u64>(),
            secret in any::<[u8; 32]>(),
        ) {
            let round = genesis(n);
            let all = keys(n);
            let in_value = Hash::compute_from(secret);
            let shares = split_in_value(&in_value, &round, &all[0], &mut StdRng::seed_from_u64(seed)).unwrap();
            prop_assert_eq!(shares.len(), n - 1);

            let threshold = shared_crypto::threshold_for(n);
            let opened: BTreeMap<MinerKey, Vec<u8>> = shares.into_iter().take(threshold).collect();
            prop_assert_eq!(reconstruct_in_value(&opened, &round).unwrap(), Some(in_value));

            let short: BTreeMap<MinerKey, Vec<u8>> = opened.into_iter().take(threshold - 1).collect();
            prop_assert_eq!(reconstruct_in_value(&short, &round).unwrap(), None);
        }

        #[test]
        fn prop_lib_offset_never_exceeds_miners(n in 1usize..15, mined in 0usize..15) {
            let mut round = genesis(n);
            for pubkey in keys(n).iter().take(mined) {
                round.miner_mut(pubkey).unwrap().out_value = Some(Hash::compute_from(pubkey.as_bytes()));
            }

            match calculate_lib_offset(&round, None) {
                Some(offset) => {
                    prop_assert!(offset >= 1);
                    prop_assert!(offset as usize <= n);
                    prop_assert!(n == 1 || mined.min(n) >= lib_threshold(n));
                }
                None => prop_assert!(n > 1 && mined.min(n) < lib_threshold(n)),
            }
        }
    }
}
