//! Integration test: ledger invariants over randomized delta sequences.
//!
//! Each test replays seeded random histories against a bare
//! `LiquidityLedger` and checks the accounting invariants after every step.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sluice_core::{
    CoreError, LimitStatus, LiquidityLedger, PolicyInput, RateLimitPolicy,
    RetainedLiquidityFloor, SignedAmount, Timestamp, BPS_DENOMINATOR,
};

const WINDOW: u64 = 4 * 3_600;
const TICK: u64 = 300;
const START: Timestamp = 1_700_000_100;

fn ledger(bps: u32) -> LiquidityLedger<()> {
    let mut ledger = LiquidityLedger::new();
    ledger.init(bps, 0, ()).expect("valid threshold");
    ledger
}

fn window_sum(ledger: &LiquidityLedger<()>) -> SignedAmount {
    ledger.nodes().map(|(_, amount)| amount).sum()
}

#[test]
fn test_window_consistency_and_alignment() {
    for seed in 0..32u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ledger = ledger(7_000);
        let mut now = START;
        let mut applied: SignedAmount = 0;

        for _ in 0..200 {
            now += rng.gen_range(0..2 * TICK);
            let amount: SignedAmount = rng.gen_range(-50_000..100_000);
            ledger
                .apply_delta(amount, now, WINDOW, TICK)
                .expect("no overflow");
            applied += amount;

            if rng.gen_bool(0.1) {
                ledger.sync(now, WINDOW, rng.gen_range(0..4));
            }

            assert_eq!(
                ledger.total_all_time() + ledger.total_in_window(),
                applied,
                "seed {seed}: totals drifted from applied deltas"
            );
            assert_eq!(ledger.total_in_window(), window_sum(&ledger));
            for tick in [ledger.head(), ledger.tail()].into_iter().flatten() {
                assert!(tick.is_aligned(TICK), "seed {seed}: unaligned tick {tick}");
            }
        }
    }
}

#[test]
fn test_nodes_are_strictly_ordered_and_unique() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut ledger = ledger(5_000);
    let mut now = START;
    for _ in 0..500 {
        now += rng.gen_range(0..TICK);
        ledger
            .apply_delta(rng.gen_range(-10..10), now, WINDOW, TICK)
            .expect("no overflow");
    }

    let ticks: Vec<_> = ledger.nodes().map(|(tick, _)| tick).collect();
    assert!(ticks.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(ticks.len(), ledger.len());
}

#[test]
fn test_sync_leaves_only_live_nodes() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut ledger = ledger(5_000);
    let mut now = START;
    for _ in 0..100 {
        now += rng.gen_range(0..3 * TICK);
        ledger
            .apply_delta(rng.gen_range(1..1_000), now, WINDOW, TICK)
            .expect("no overflow");
    }

    let later = now + rng.gen_range(0..WINDOW);
    ledger.sync(later, WINDOW, usize::MAX);
    assert!(ledger.nodes().all(|(tick, _)| tick.age(later) < WINDOW));
    assert_eq!(ledger.total_in_window(), window_sum(&ledger));
}

#[test]
fn test_same_tick_deltas_merge() {
    let mut ledger = ledger(5_000);
    ledger.apply_delta(40, START + 1, WINDOW, TICK).expect("delta");
    ledger.apply_delta(-15, START + TICK - 1, WINDOW, TICK).expect("delta");

    assert_eq!(ledger.len(), 1);
    let (tick, amount) = ledger.nodes().next().expect("one node");
    assert_eq!(tick.as_secs(), START);
    assert_eq!(amount, 25);
}

#[test]
fn test_threshold_boundaries() {
    for bps in [0, BPS_DENOMINATOR + 1, u32::MAX] {
        let mut ledger = LiquidityLedger::<()>::new();
        assert_eq!(ledger.init(bps, 0, ()), Err(CoreError::InvalidThreshold(bps)));
    }
    for bps in [1, BPS_DENOMINATOR] {
        let mut ledger = LiquidityLedger::<()>::new();
        assert!(ledger.init(bps, 0, ()).is_ok());
        assert_eq!(
            ledger.update_params(bps, 0, (), START, WINDOW),
            Ok(())
        );
    }
}

#[test]
fn test_trigger_matches_truncated_floor() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..10_000 {
        let input = PolicyInput {
            total_all_time: rng.gen_range(0..1_000_000_000_000),
            total_in_window: rng.gen_range(-1_000_000_000_000..1_000_000_000),
            min_retained_bps: rng.gen_range(1..=BPS_DENOMINATOR),
            begin_threshold: 0,
        };
        let floor = input.total_all_time * SignedAmount::from(input.min_retained_bps)
            / SignedAmount::from(BPS_DENOMINATOR);
        let expected = if input.total_all_time + input.total_in_window < floor {
            LimitStatus::Triggered
        } else {
            LimitStatus::Ok
        };
        assert_eq!(RetainedLiquidityFloor.evaluate(&input), expected, "{input:?}");
    }
}

#[test]
fn test_override_beats_any_numbers() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut ledger = ledger(BPS_DENOMINATOR);
    ledger.set_overridden(true).expect("initialized");
    let mut now = START;
    for _ in 0..100 {
        now += rng.gen_range(0..TICK);
        ledger
            .apply_delta(rng.gen_range(-1_000..10), now, WINDOW, TICK)
            .expect("delta");
        assert_eq!(ledger.status(), LimitStatus::Ok);
    }
}
