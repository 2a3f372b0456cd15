//! Integration test: end-to-end breaker scenarios.
//!
//! Exercises sluice-breaker, sluice-settlement and sluice-core together
//! through the shared [`Pool`] fixture.

use std::sync::Arc;

use sluice_breaker::{BreakerError, BreakerEvent};
use sluice_core::{AccountId, CoreError, LimitStatus, Tick};
use sluice_integration_tests::{admin, usdc, Pool, DAY, HOUR, SETTLEMENT_DELAY, T0};
use sluice_settlement::{EffectStatus, SettlementError, SettlementStrategy, SettlementTarget};

fn alice() -> AccountId {
    AccountId::from("alice")
}

/// Deposit 1,000,000 and move past the window so it settles.
fn seeded_pool() -> Pool {
    let mut pool = Pool::new();
    pool.deposit(1_000_000).expect("deposit");
    pool.advance(5 * HOUR);
    pool
}

// =========================================================================
// Trigger and diversion
// =========================================================================

#[test]
fn test_breach_diverts_withdrawal_to_settlement() {
    let mut pool = seeded_pool();

    let outcome = pool.withdraw(300_001, &alice()).expect("outflow");
    assert!(outcome.triggered);

    // Recipient balance unchanged; funds sit with the strategy.
    assert_eq!(pool.balance(&alice()), 0);
    assert_eq!(pool.balance(&AccountId::from("delayed-custody")), 300_001);

    let ledger = pool.breaker.ledger(&usdc()).expect("registered");
    assert_eq!(ledger.status(), LimitStatus::Triggered);
    assert_eq!(ledger.total_in_window(), -300_001);
    assert_eq!(ledger.total_all_time(), 1_000_000);
    assert!(pool.breaker.is_system_rate_limited());

    let effect = pool
        .delayed
        .get(&outcome.effect_id.expect("effect id"))
        .expect("effect registered");
    assert_eq!(effect.status, EffectStatus::Scheduled);
    assert_eq!(effect.ready_at, Some(pool.now() + SETTLEMENT_DELAY));
}

#[test]
fn test_override_flag_lets_withdrawal_complete() {
    let mut pool = seeded_pool();
    pool.breaker
        .override_limiter_flag(&admin(), &usdc(), true)
        .expect("override");

    let outcome = pool.withdraw(300_001, &alice()).expect("outflow");
    assert!(!outcome.triggered);
    assert_eq!(pool.balance(&alice()), 300_001);
    assert!(!pool.breaker.is_system_rate_limited());
}

#[test]
fn test_delayed_release_after_delay() {
    let mut pool = seeded_pool();
    pool.withdraw(300_001, &alice()).expect("outflow");
    let target = SettlementTarget::new(usdc(), alice());

    pool.advance(SETTLEMENT_DELAY - 1);
    assert!(matches!(
        pool.delayed.execute(&target, 300_001, b""),
        Err(SettlementError::TooEarly { .. })
    ));

    pool.advance(1);
    pool.delayed
        .execute(&target, 300_001, b"")
        .expect("release after delay");
    assert_eq!(pool.balance(&alice()), 300_001);
    assert_eq!(pool.balance(&AccountId::from("delayed-custody")), 0);
}

#[test]
fn test_cancelled_effect_stays_in_custody() {
    let mut pool = seeded_pool();
    let outcome = pool.withdraw(300_001, &alice()).expect("outflow");
    let effect_id = outcome.effect_id.expect("effect id");

    pool.delayed.cancel(&effect_id).expect("cancel");
    pool.advance(SETTLEMENT_DELAY);

    let target = SettlementTarget::new(usdc(), alice());
    assert_eq!(
        pool.delayed.execute(&target, 300_001, b""),
        Err(SettlementError::Cancelled(effect_id))
    );
    assert_eq!(pool.balance(&AccountId::from("delayed-custody")), 300_001);
}

#[test]
fn test_reject_strategy_fails_closed() {
    let mut pool = seeded_pool();
    let reject = pool.reject.clone();
    pool.breaker
        .update_asset_params(&admin(), &usdc(), 7_000, 1_000, reject.clone())
        .expect("switch strategy");

    let outcome = pool.withdraw(300_001, &alice()).expect("outflow");
    assert!(outcome.triggered);
    pool.advance(30 * DAY);

    let target = SettlementTarget::new(usdc(), alice());
    assert_eq!(
        reject.execute(&target, 300_001, b""),
        Err(SettlementError::Unexecutable)
    );
    assert_eq!(pool.balance(&alice()), 0);
    assert_eq!(reject.blocked_value(), 300_001);
}

// =========================================================================
// Latch controls
// =========================================================================

#[test]
fn test_cooldown_expiry_clears_latch_without_admin() {
    let mut pool = seeded_pool();
    pool.withdraw(300_001, &alice()).expect("outflow");
    assert!(pool.breaker.is_system_rate_limited());

    assert!(matches!(
        pool.breaker.override_expired_rate_limit(),
        Err(BreakerError::Core(CoreError::CooldownNotElapsed { .. }))
    ));

    pool.advance(3 * DAY);
    pool.breaker
        .override_expired_rate_limit()
        .expect("permissionless clear");
    assert!(!pool.breaker.is_system_rate_limited());

    let events = pool.breaker.drain_events();
    assert!(matches!(
        events.last(),
        Some(BreakerEvent::RateLimitOverridden { expired: true, .. })
    ));
}

#[test]
fn test_grace_period_suppresses_diversion() {
    let mut pool = seeded_pool();
    let end = pool.now() + 2 * HOUR;
    pool.breaker
        .start_grace_period(&admin(), end)
        .expect("grace period");

    let outcome = pool.withdraw(300_001, &alice()).expect("outflow");
    assert!(!outcome.triggered);
    assert_eq!(pool.balance(&alice()), 300_001);
    // Accounting continues normally.
    assert_eq!(pool.breaker.asset_status(&usdc()), LimitStatus::Triggered);
    assert!(!pool.breaker.is_system_rate_limited());

    pool.advance(2 * HOUR + 1);
    let outcome = pool.withdraw(1, &alice()).expect("outflow");
    assert!(outcome.triggered);
}

#[test]
fn test_halted_breaker_rejects_flows() {
    let mut pool = seeded_pool();
    pool.breaker
        .set_operational_status(&admin(), false)
        .expect("halt");

    assert_eq!(pool.deposit(1), Err(BreakerError::NotOperational));
    assert_eq!(
        pool.withdraw(1, &alice()),
        Err(BreakerError::NotOperational)
    );
    assert_eq!(
        pool.breaker.set_operational_status(&admin(), true),
        Err(BreakerError::Core(CoreError::HaltIsFinal))
    );
}

// =========================================================================
// Failure atomicity
// =========================================================================

#[test]
fn test_mover_failure_leaves_no_trace() {
    let mut pool = seeded_pool();
    let snapshot = pool.breaker.ledger_snapshot(&usdc()).expect("registered");
    pool.breaker.drain_events();
    pool.custody.reject_transfers_to(alice(), "sanctioned");

    let result = pool.withdraw(10, &alice());
    assert!(matches!(
        result,
        Err(BreakerError::Settlement(SettlementError::TransferRejected { .. }))
    ));
    assert_eq!(pool.breaker.ledger_snapshot(&usdc()), Some(snapshot));
    assert!(pool.breaker.drain_events().is_empty());
}

#[test]
fn test_diverted_funds_to_rejecting_custody_roll_back() {
    let mut pool = seeded_pool();
    pool.custody
        .reject_transfers_to(AccountId::from("delayed-custody"), "custody paused");

    let result = pool.withdraw(300_001, &alice());
    assert!(result.is_err());
    assert!(!pool.breaker.is_system_rate_limited());
    assert!(pool.delayed.is_empty());
    assert_eq!(
        pool.balance(pool.breaker.custody_account()),
        300_001,
        "staged funds stay with the breaker"
    );
}

// =========================================================================
// Backlog compaction
// =========================================================================

#[test]
fn test_backlog_compaction_keeps_window_entries() {
    let mut pool = Pool::new();
    for _ in 0..5 {
        pool.deposit(1).expect("deposit");
        pool.advance(HOUR);
    }
    // Now T0 + 5h. The 4h window still covers T0+2h..T0+4h.
    let evicted = pool
        .breaker
        .compact_backlog(&usdc(), usize::MAX)
        .expect("compact");
    assert_eq!(evicted, 1);

    let snapshot = pool.breaker.ledger_snapshot(&usdc()).expect("registered");
    let mut cursor = snapshot.head;
    let mut reachable = Vec::new();
    let mut sum = 0;
    while let Some(tick) = cursor {
        let node = pool.breaker.ledger_node(&usdc(), tick).expect("linked node");
        reachable.push(tick);
        sum += node.amount;
        cursor = node.next_tick;
    }

    assert_eq!(
        reachable,
        vec![
            Tick::from_secs(T0 + 2 * HOUR),
            Tick::from_secs(T0 + 3 * HOUR),
            Tick::from_secs(T0 + 4 * HOUR),
        ]
    );
    assert_eq!(sum, snapshot.total_in_window);
    assert_eq!(snapshot.total_all_time, 2);
    assert!(pool
        .breaker
        .ledger_node(&usdc(), Tick::from_secs(T0 + HOUR))
        .is_none());
}

#[test]
fn test_breach_event_stream() {
    let mut pool = seeded_pool();
    pool.breaker.drain_events();
    pool.withdraw(300_001, &alice()).expect("outflow");

    let names: Vec<&str> = pool
        .breaker
        .drain_events()
        .iter()
        .map(|e| e.name())
        .collect();
    assert_eq!(names, vec!["asset_outflow", "asset_rate_limit_breached"]);
}

#[test]
fn test_events_serialize_for_export() {
    let mut pool = seeded_pool();
    pool.withdraw(300_001, &alice()).expect("outflow");

    let events = pool.breaker.drain_events();
    let json = serde_json::to_value(&events).expect("serialize");
    let breach = json
        .as_array()
        .and_then(|all| all.iter().find(|e| e["event"] == "asset_rate_limit_breached"))
        .expect("breach event");
    assert_eq!(breach["asset"], "USDC");
    assert_eq!(breach["effect_id"].as_str().map(str::len), Some(64));
}

#[test]
fn test_strategies_are_shared_across_assets() {
    let mut pool = seeded_pool();
    let eth = sluice_core::AssetId::from("ETH");
    let delayed: Arc<dyn SettlementStrategy> = pool.delayed.clone();
    pool.breaker
        .register_asset(&admin(), eth.clone(), 5_000, 0, delayed)
        .expect("register ETH");

    assert_eq!(pool.breaker.assets().count(), 2);
    assert_eq!(pool.breaker.asset_status(&eth), LimitStatus::Ok);
    assert_eq!(pool.breaker.asset_status(&usdc()), LimitStatus::Inactive);
}
