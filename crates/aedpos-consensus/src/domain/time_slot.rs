//! Time-slot arithmetic over a round.
//!
//! Slots are laid out as `base + order * interval`; the extra block slot
//! follows the last miner by one interval, so a full round spans
//! `(N + 1) * interval`.

use super::{Round, Timestamp, SINGLE_MINER_MINING_INTERVAL_MS};

impl Round {
    /// Distance between the order-1 and order-2 slots.
    pub fn mining_interval(&self) -> i64 {
        if self.miner_count() < 2 {
            return SINGLE_MINER_MINING_INTERVAL_MS;
        }
        match (self.miner_at_order(1), self.miner_at_order(2)) {
            (Some(first), Some(second)) => second
                .expected_mining_time
                .millis_since(first.expected_mining_time)
                .abs(),
            _ => SINGLE_MINER_MINING_INTERVAL_MS,
        }
    }

    /// Expected mining time of the order-1 miner.
    pub fn start_time(&self) -> Timestamp {
        self.first_miner()
            .map(|m| m.expected_mining_time)
            .unwrap_or_default()
    }

    pub fn total_milliseconds(&self) -> i64 {
        (self.miner_count() as i64 + 1).saturating_mul(self.mining_interval())
    }

    /// End of this round, pushed back by `missed_rounds` whole rounds.
    pub fn expected_end_time(&self, missed_rounds: i64) -> Timestamp {
        let total = self.total_milliseconds();
        self.start_time()
            .add_millis(total)
            .add_millis(missed_rounds.saturating_mul(total))
    }

    pub fn extra_block_mining_time(&self) -> Timestamp {
        self.real_time_miners_information
            .values()
            .map(|m| m.expected_mining_time)
            .max()
            .unwrap_or_default()
            .add_millis(self.mining_interval())
    }

    /// `Timestamp::MAX` for miners outside the round.
    pub fn expected_mining_time_of(&self, pubkey: &str) -> Timestamp {
        self.miner(pubkey)
            .map(|m| m.expected_mining_time)
            .unwrap_or(Timestamp::MAX)
    }

    /// A slot has passed once `now` is beyond its first half.
    pub fn is_time_slot_passed(&self, pubkey: &str, now: Timestamp) -> bool {
        match self.miner(pubkey) {
            Some(miner) => miner
                .expected_mining_time
                .add_millis(self.mining_interval() / 2)
                < now,
            None => false,
        }
    }

    /// Slot for a miner terminating a round it did not finish normally.
    pub fn arrange_abnormal_mining_time(&self, pubkey: &str, now: Timestamp) -> Timestamp {
        let Some(miner) = self.miner(pubkey) else {
            return Timestamp::MAX;
        };
        if !self.is_time_slot_passed(pubkey, now) && miner.out_value.is_none() {
            return Timestamp::MAX;
        }

        if miner.is_extra_block_producer {
            let extra = self.extra_block_mining_time();
            if extra > now {
                return extra;
            }
        }

        let total = self.total_milliseconds();
        let missed_rounds = if total > 0 {
            now.millis_since(self.start_time()) / total
        } else {
            0
        };
        self.expected_end_time(missed_rounds)
            .add_millis(miner.order.saturating_mul(self.mining_interval()))
    }

    /// Every slot gap must stay within one base gap of the first one.
    pub fn check_time_slots(&self) -> Result<(), String> {
        let miners = self.ordered_miners();
        match miners.len() {
            0 => return Err("Round has no miners".into()),
            1 => return Ok(()),
            _ => {}
        }

        let base = miners[1]
            .expected_mining_time
            .millis_since(miners[0].expected_mining_time);
        if base <= 0 {
            return Err("Mining interval must be greater than 0".into());
        }

        for pair in miners.windows(2).skip(1) {
            let gap = pair[1]
                .expected_mining_time
                .millis_since(pair[0].expected_mining_time);
            if (gap - base).abs() > base {
                return Err(format!(
                    "Time slot of {} is {}ms from its predecessor, base is {}ms",
                    pair[1].pubkey, gap, base
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{key, mine, round_with};
    use super::*;
    use proptest::prelude::*;

    fn keys(n: u8) -> Vec<String> {
        (1..=n).map(key).collect()
    }

    #[test]
    fn test_single_miner_interval() {
        let round = round_with(&keys(1), 0, 4_000);
        assert_eq!(round.mining_interval(), SINGLE_MINER_MINING_INTERVAL_MS);
        assert!(round.check_time_slots().is_ok());
    }

    #[test]
    fn test_round_geometry() {
        let round = round_with(&keys(4), 10_000, 4_000);
        assert_eq!(round.mining_interval(), 4_000);
        assert_eq!(round.start_time(), Timestamp::from_millis(14_000));
        assert_eq!(round.total_milliseconds(), 20_000);
        assert_eq!(round.expected_end_time(0), Timestamp::from_millis(34_000));
        assert_eq!(round.expected_end_time(2), Timestamp::from_millis(74_000));
        assert_eq!(round.extra_block_mining_time(), Timestamp::from_millis(30_000));
    }

    #[test]
    fn test_unknown_miner() {
        let round = round_with(&keys(2), 0, 4_000);
        assert_eq!(round.expected_mining_time_of("nobody"), Timestamp::MAX);
        assert!(!round.is_time_slot_passed("nobody", Timestamp::MAX));
    }

    #[test]
    fn test_time_slot_passes_after_half_interval() {
        let round = round_with(&keys(2), 0, 4_000);
        let first = key(1);
        assert!(!round.is_time_slot_passed(&first, Timestamp::from_millis(6_000)));
        assert!(round.is_time_slot_passed(&first, Timestamp::from_millis(6_001)));
    }

    #[test]
    fn test_abnormal_time_before_slot_without_out_value() {
        let round = round_with(&keys(3), 0, 4_000);
        assert_eq!(
            round.arrange_abnormal_mining_time(&key(2), Timestamp::from_millis(1_000)),
            Timestamp::MAX
        );
    }

    #[test]
    fn test_abnormal_time_extra_block_producer() {
        let mut round = round_with(&keys(3), 0, 4_000);
        mine(&mut round, &key(1), 1);
        // Order 1 is the extra block producer; its extra slot is still ahead.
        assert_eq!(
            round.arrange_abnormal_mining_time(&key(1), Timestamp::from_millis(9_000)),
            Timestamp::from_millis(16_000)
        );
    }

    #[test]
    fn test_abnormal_time_staggers_by_order() {
        let round = round_with(&keys(3), 0, 4_000);
        let now = Timestamp::from_millis(20_000);
        // start 4s, total 16s, missed = 1, end = 36s
        assert_eq!(
            round.arrange_abnormal_mining_time(&key(2), now),
            Timestamp::from_millis(44_000)
        );
        assert_eq!(
            round.arrange_abnormal_mining_time(&key(3), now),
            Timestamp::from_millis(48_000)
        );
    }

    #[test]
    fn test_check_time_slots_rejects_uneven_gaps() {
        let mut round = round_with(&keys(3), 0, 4_000);
        round.miner_mut(&key(3)).unwrap().expected_mining_time = Timestamp::from_millis(40_000);
        assert!(round.check_time_slots().is_err());

        let mut collapsed = round_with(&keys(2), 0, 4_000);
        collapsed.miner_mut(&key(2)).unwrap().expected_mining_time = Timestamp::from_millis(4_000);
        assert!(collapsed.check_time_slots().is_err());
    }

    proptest! {
        #[test]
        fn prop_slots_are_evenly_spaced(
            miners in 2u8..=21,
            interval in 1i64..=60_000,
            start in 0i64..=4_000_000_000_000,
        ) {
            let round = round_with(&keys(miners), start, interval);
            let first = round.first_miner().unwrap().expected_mining_time;
            for miner in round.ordered_miners() {
                prop_assert_eq!(
                    miner.expected_mining_time.millis_since(first),
                    (miner.order - 1) * interval
                );
            }
            prop_assert_eq!(round.mining_interval(), interval);
            prop_assert!(round.check_time_slots().is_ok());
        }
    }
}
