//! Behaviour decision.
//!
//! Given the round state and the time, a miner has exactly one thing to do
//! next. The decision never fails: a miner outside the round, or a node
//! without rounds, gets [`Behaviour::Nothing`].

use super::{is_time_to_change_term, Round, Timestamp, TINY_BLOCKS_NUMBER};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a miner should produce next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behaviour {
    Nothing,
    /// First block of a miner in a round with nothing to reveal
    UpdateValueWithoutPreviousInValue,
    /// First block of a miner in a round, revealing the previous in-value
    UpdateValue,
    TinyBlock,
    NextRound,
    NextTerm,
}

impl Behaviour {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::UpdateValueWithoutPreviousInValue => "update_value_without_previous_in_value",
            Self::UpdateValue => "update_value",
            Self::TinyBlock => "tiny_block",
            Self::NextRound => "next_round",
            Self::NextTerm => "next_term",
        }
    }
}

impl fmt::Display for Behaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of [`decide_behaviour`].
#[derive(Clone, Copy, Debug)]
pub struct DecisionContext<'a> {
    pub current: Option<&'a Round>,
    pub previous: Option<&'a Round>,
    pub now: Timestamp,
    pub pubkey: &'a str,
    pub time_each_term_secs: i64,
    pub blockchain_start: Option<Timestamp>,
}

impl DecisionContext<'_> {
    fn term_just_changed(&self, current: &Round) -> bool {
        self.previous
            .map_or(true, |previous| previous.term_number != current.term_number)
    }

    fn is_previous_extra_block_producer(&self, current: &Round) -> bool {
        current.extra_block_producer_of_previous_round.as_deref() == Some(self.pubkey)
    }
}

pub fn decide_behaviour(ctx: &DecisionContext<'_>) -> Behaviour {
    let Some(current) = ctx.current else {
        return Behaviour::Nothing;
    };
    let Some(miner) = current.miner(ctx.pubkey) else {
        return Behaviour::Nothing;
    };
    let slot_passed = current.is_time_slot_passed(ctx.pubkey, ctx.now);
    let tiny = miner.produced_tiny_blocks;

    if miner.out_value.is_none() {
        if ctx.previous.is_none() && miner.order != 1 {
            let boot_pending = current.first_miner().map_or(true, |m| m.out_value.is_none());
            if boot_pending {
                return Behaviour::NextRound;
            }
        }
        if ctx.term_just_changed(current) {
            return Behaviour::UpdateValueWithoutPreviousInValue;
        }
        if ctx.is_previous_extra_block_producer(current)
            && ctx.now < current.start_time()
            && tiny < TINY_BLOCKS_NUMBER
        {
            return Behaviour::TinyBlock;
        }
        if !slot_passed {
            return Behaviour::UpdateValue;
        }
    } else if !slot_passed {
        if tiny < TINY_BLOCKS_NUMBER {
            return Behaviour::TinyBlock;
        }
        if ctx.is_previous_extra_block_producer(current)
            && !ctx.term_just_changed(current)
            && tiny < TINY_BLOCKS_NUMBER * 2
        {
            return Behaviour::TinyBlock;
        }
    }

    terminate_round(ctx, current)
}

fn terminate_round(ctx: &DecisionContext<'_>, current: &Round) -> Behaviour {
    if ctx.time_each_term_secs == i64::MAX || current.round_number == 1 {
        return Behaviour::NextRound;
    }
    match ctx.blockchain_start {
        Some(start)
            if is_time_to_change_term(
                current,
                ctx.previous,
                start,
                current.term_number,
                ctx.time_each_term_secs,
            ) =>
        {
            Behaviour::NextTerm
        }
        _ => Behaviour::NextRound,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{key, mine, round_with};
    use super::*;
    use proptest::prelude::*;

    const WEEK: i64 = 604_800;

    fn keys(n: u8) -> Vec<String> {
        (1..=n).map(key).collect()
    }

    fn ctx<'a>(
        current: Option<&'a Round>,
        previous: Option<&'a Round>,
        pubkey: &'a str,
        now: i64,
    ) -> DecisionContext<'a> {
        DecisionContext {
            current,
            previous,
            now: Timestamp::from_millis(now),
            pubkey,
            time_each_term_secs: WEEK,
            blockchain_start: Some(Timestamp::from_millis(0)),
        }
    }

    /// Round 2 of term 1 over `all`, slots at 100s + order * 4s, with a
    /// fully mined round 1 before it.
    fn second_round(all: &[String]) -> (Round, Round) {
        let mut previous = round_with(all, 0, 4_000);
        for (i, k) in all.iter().enumerate() {
            mine(&mut previous, k, i as i64 + 1);
        }
        let mut current = round_with(all, 100_000, 4_000);
        current.round_number = 2;
        (current, previous)
    }

    #[test]
    fn test_nothing_without_round_or_membership() {
        let all = keys(3);
        let (current, previous) = second_round(&all);
        assert_eq!(decide_behaviour(&ctx(None, None, &all[0], 0)), Behaviour::Nothing);
        assert_eq!(
            decide_behaviour(&ctx(Some(&current), Some(&previous), "stranger", 0)),
            Behaviour::Nothing
        );
    }

    #[test]
    fn test_first_round_waits_for_boot_miner() {
        let all = keys(3);
        let mut round = round_with(&all, 0, 4_000);
        assert_eq!(
            decide_behaviour(&ctx(Some(&round), None, &all[1], 0)),
            Behaviour::NextRound
        );
        assert_eq!(
            decide_behaviour(&ctx(Some(&round), None, &all[0], 0)),
            Behaviour::UpdateValueWithoutPreviousInValue
        );

        mine(&mut round, &all[0], 1);
        assert_eq!(
            decide_behaviour(&ctx(Some(&round), None, &all[1], 0)),
            Behaviour::UpdateValueWithoutPreviousInValue
        );
    }

    #[test]
    fn test_update_value_inside_slot() {
        let all = keys(3);
        let (current, previous) = second_round(&all);
        assert_eq!(
            decide_behaviour(&ctx(Some(&current), Some(&previous), &all[1], 107_000)),
            Behaviour::UpdateValue
        );
    }

    #[test]
    fn test_new_term_skips_reveal() {
        let all = keys(3);
        let (mut current, previous) = second_round(&all);
        current.term_number = 2;
        assert_eq!(
            decide_behaviour(&ctx(Some(&current), Some(&previous), &all[1], 107_000)),
            Behaviour::UpdateValueWithoutPreviousInValue
        );
    }

    #[test]
    fn test_tiny_blocks_after_update() {
        let all = keys(3);
        let (mut current, previous) = second_round(&all);
        mine(&mut current, &all[0], 2);
        current.miner_mut(&all[0]).unwrap().produced_tiny_blocks = 1;
        assert_eq!(
            decide_behaviour(&ctx(Some(&current), Some(&previous), &all[0], 104_500)),
            Behaviour::TinyBlock
        );

        current.miner_mut(&all[0]).unwrap().produced_tiny_blocks = TINY_BLOCKS_NUMBER;
        assert_eq!(
            decide_behaviour(&ctx(Some(&current), Some(&previous), &all[0], 104_500)),
            Behaviour::NextRound
        );
    }

    #[test]
    fn test_previous_extra_block_producer_keeps_producing() {
        let all = keys(3);
        let (mut current, previous) = second_round(&all);
        current.extra_block_producer_of_previous_round = Some(all[2].clone());
        current.miner_mut(&all[2]).unwrap().produced_tiny_blocks = 1;

        // Before the round starts, without an out-value.
        assert_eq!(
            decide_behaviour(&ctx(Some(&current), Some(&previous), &all[2], 100_500)),
            Behaviour::TinyBlock
        );

        // Inside its own slot with a doubled quota.
        mine(&mut current, &all[2], 1);
        current.miner_mut(&all[2]).unwrap().produced_tiny_blocks = TINY_BLOCKS_NUMBER + 3;
        assert_eq!(
            decide_behaviour(&ctx(Some(&current), Some(&previous), &all[2], 112_500)),
            Behaviour::TinyBlock
        );
    }

    #[test]
    fn test_missed_slot_on_side_chain_is_next_round() {
        let all = keys(3);
        let (current, previous) = second_round(&all);
        let mut side = ctx(Some(&current), Some(&previous), &all[0], 10_000_000_000);
        side.time_each_term_secs = i64::MAX;
        assert_eq!(decide_behaviour(&side), Behaviour::NextRound);
    }

    #[test]
    fn test_next_term_when_miners_crossed_boundary() {
        let all = keys(3);
        let (mut current, previous) = second_round(&all);
        let late = Timestamp::from_millis(WEEK * 1000 + 1_000);
        for k in &all {
            current.miner_mut(k).unwrap().actual_mining_times.push(late);
        }
        assert_eq!(
            decide_behaviour(&ctx(Some(&current), Some(&previous), &all[0], WEEK * 1000 + 2_000)),
            Behaviour::NextTerm
        );

        let mut unknown_start = ctx(Some(&current), Some(&previous), &all[0], WEEK * 1000 + 2_000);
        unknown_start.blockchain_start = None;
        assert_eq!(decide_behaviour(&unknown_start), Behaviour::NextRound);
    }

    proptest! {
        #[test]
        fn prop_nothing_iff_absent(
            miners in 1u8..=7,
            probe in 0u8..=9,
            now in 0i64..=400_000,
            mined_mask in any::<u8>(),
            tiny in 0i64..=20,
            with_previous in any::<bool>(),
        ) {
            let all = keys(miners);
            let (mut current, previous) = second_round(&all);
            for (i, k) in all.iter().enumerate() {
                if mined_mask & (1 << i) != 0 {
                    mine(&mut current, k, i as i64 + 1);
                }
                current.miner_mut(k).unwrap().produced_tiny_blocks = tiny;
            }
            let pubkey = key(probe);
            let behaviour = decide_behaviour(&ctx(
                Some(&current),
                with_previous.then_some(&previous),
                &pubkey,
                now,
            ));
            let present = current.is_in_miner_list(&pubkey);
            prop_assert_eq!(behaviour == Behaviour::Nothing, !present);
        }
    }
}
