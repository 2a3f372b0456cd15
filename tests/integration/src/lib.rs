//! Shared fixtures for the Sluice integration tests.
//!
//! [`Pool`] wires a breaker to a manual clock, an in-memory custody book and
//! both built-in settlement strategies, with one registered asset (`USDC`,
//! 70% retained, active above 1,000 units, delayed settlement).

use std::sync::Arc;

use sluice_breaker::{BreakerError, CircuitBreaker, OutflowOutcome};
use sluice_core::{AccountId, AssetId, Clock, ManualClock, Timestamp, WindowConfig};
use sluice_settlement::{AssetMover, DelayedSettlement, InMemoryCustody, RejectSettlement};

/// Tick-aligned start time.
pub const T0: Timestamp = 1_700_000_100;
pub const HOUR: u64 = 3_600;
pub const DAY: u64 = 24 * HOUR;
/// Default settlement delay of the fixture's delayed strategy.
pub const SETTLEMENT_DELAY: u64 = DAY;

pub fn admin() -> AccountId {
    AccountId::from("admin")
}

pub fn vault() -> AccountId {
    AccountId::from("vault")
}

pub fn usdc() -> AssetId {
    AssetId::from("USDC")
}

pub struct Pool {
    pub clock: Arc<ManualClock>,
    pub custody: Arc<InMemoryCustody>,
    pub delayed: Arc<DelayedSettlement>,
    pub reject: Arc<RejectSettlement>,
    pub breaker: CircuitBreaker,
}

impl Pool {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(T0));
        let custody = Arc::new(InMemoryCustody::new());
        let delayed = Arc::new(DelayedSettlement::new(
            AccountId::from("delayed-custody"),
            SETTLEMENT_DELAY,
            clock.clone(),
            custody.clone(),
        ));
        let reject = Arc::new(RejectSettlement::new(
            AccountId::from("reject-custody"),
            clock.clone(),
        ));

        let mut breaker = CircuitBreaker::new(
            admin(),
            AccountId::from("breaker"),
            WindowConfig::default(),
            clock.clone(),
            custody.clone(),
        )
        .expect("default window is valid");
        breaker
            .add_protected_callers(&admin(), &[vault()])
            .expect("admin can add callers");
        breaker
            .register_asset(&admin(), usdc(), 7_000, 1_000, delayed.clone())
            .expect("USDC registers");
        breaker.drain_events();

        Self {
            clock,
            custody,
            delayed,
            reject,
            breaker,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn advance(&self, secs: u64) -> Timestamp {
        self.clock.advance(secs)
    }

    /// Record a USDC deposit through the protected vault.
    pub fn deposit(&mut self, amount: u128) -> Result<(), BreakerError> {
        self.breaker.record_inflow(&vault(), &usdc(), amount)
    }

    /// Stage `amount` in breaker custody and record a USDC withdrawal.
    pub fn withdraw(
        &mut self,
        amount: u128,
        recipient: &AccountId,
    ) -> Result<OutflowOutcome, BreakerError> {
        self.custody
            .deposit(&usdc(), self.breaker.custody_account(), amount)?;
        self.breaker
            .record_outflow(&vault(), &usdc(), amount, recipient, b"")
    }

    pub fn balance(&self, account: &AccountId) -> i128 {
        self.custody.balance_of(&usdc(), account)
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}
