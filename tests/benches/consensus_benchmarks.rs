//! # AEDPoS Consensus Benchmarks
//!
//! Every node runs these on every block:
//!
//! | Operation | Runs |
//! |-----------|------|
//! | Behaviour decision | per command query |
//! | LIB offset | after each executed block |
//! | In-value split and recovery | per `UpdateValue` |
//! | Round hash | before and after execution |

use aedpos_consensus::domain::{
    calculate_lib_offset, decide_behaviour, reconstruct_in_value, split_in_value,
    DecisionContext,
};
use aedpos_consensus::{generate_genesis_round, Hash, MinerKey, Round, Timestamp};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;
use std::time::Duration;

const MINER_COUNTS: [usize; 4] = [5, 17, 51, 101];

fn keys(n: usize) -> Vec<MinerKey> {
    (0..n).map(|i| format!("{:02x}{}", i, "ab".repeat(32))).collect()
}

/// Genesis round where the first two thirds of the miners have produced.
fn busy_round(n: usize) -> Round {
    let mut round = generate_genesis_round(&keys(n), 4_000, Timestamp::from_millis(0))
        .unwrap_or_else(|e| panic!("genesis for {n} miners: {e}"));
    for (i, pubkey) in keys(n).iter().enumerate().take(n * 2 / 3) {
        if let Some(miner) = round.miner_mut(pubkey) {
            miner.out_value = Some(Hash::compute_from(pubkey.as_bytes()));
            miner.actual_mining_times.push(miner.expected_mining_time);
            miner.produced_blocks = 1;
            miner.produced_tiny_blocks = 1;
            miner.supposed_order_of_next_round = i as i64 + 1;
            miner.final_order_of_next_round = i as i64 + 1;
        }
    }
    round
}

fn bench_behaviour_decision(c: &mut Criterion) {
    let mut group = c.benchmark_group("behaviour-decision");
    for n in MINER_COUNTS {
        let round = busy_round(n);
        let pubkey = keys(n)[n - 1].clone();
        group.bench_with_input(BenchmarkId::from_parameter(n), &round, |b, round| {
            b.iter(|| {
                let ctx = DecisionContext {
                    current: Some(round),
                    previous: None,
                    now: Timestamp::from_millis(2_000),
                    pubkey: &pubkey,
                    time_each_term_secs: 604_800,
                    blockchain_start: Some(Timestamp::from_millis(0)),
                };
                black_box(decide_behaviour(&ctx))
            })
        });
    }
    group.finish();
}

fn bench_lib_offset(c: &mut Criterion) {
    let mut group = c.benchmark_group("lib-offset");
    for n in MINER_COUNTS {
        let previous = busy_round(n);
        let current = generate_genesis_round(&keys(n), 4_000, Timestamp::from_millis(0))
            .unwrap_or_else(|e| panic!("genesis for {n} miners: {e}"));
        group.bench_with_input(
            BenchmarkId::from_parameter(n),
            &(current, previous),
            |b, (current, previous)| b.iter(|| black_box(calculate_lib_offset(current, Some(previous)))),
        );
    }
    group.finish();
}

fn bench_secret_sharing(c: &mut Criterion) {
    let mut group = c.benchmark_group("in-value-sharing");
    group.measurement_time(Duration::from_secs(5));
    let in_value = Hash::compute_from(b"in value");

    for n in MINER_COUNTS {
        let round = busy_round(n);
        let sender = keys(n)[0].clone();
        group.bench_with_input(BenchmarkId::new("split", n), &round, |b, round| {
            b.iter(|| black_box(split_in_value(&in_value, round, &sender, &mut rand::thread_rng())))
        });

        let shares: BTreeMap<MinerKey, Vec<u8>> =
            split_in_value(&in_value, &round, &sender, &mut rand::thread_rng())
                .unwrap_or_else(|e| panic!("split for {n} miners: {e}"));
        group.bench_with_input(BenchmarkId::new("reconstruct", n), &round, |b, round| {
            b.iter(|| black_box(reconstruct_in_value(&shares, round)))
        });
    }
    group.finish();
}

fn bench_round_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("round-hash");
    for n in MINER_COUNTS {
        let round = busy_round(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &round, |b, round| {
            b.iter(|| black_box(round.get_hash(true)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_behaviour_decision,
    bench_lib_offset,
    bench_secret_sharing,
    bench_round_hash
);
criterion_main!(benches);
