//! The circuit breaker orchestrator.
//!
//! Owns one [`LiquidityLedger`] per tracked asset plus the global
//! [`BreakerState`]. Callers move outflow funds into the breaker's custody
//! account before calling [`CircuitBreaker::record_outflow`]; the breaker
//! then either forwards them to the recipient or, on a breach, hands them to
//! the asset's settlement strategy.
//!
//! Every fallible operation is all-or-nothing: on error the ledger, the
//! breaker state and the event buffer are left exactly as they were.

use std::collections::HashMap;
use std::sync::Arc;

use sluice_core::{
    to_signed, AccountId, AssetId, BreakerState, Clock, CoreError, LedgerNode, LedgerSnapshot,
    LimitStatus, LiquidityLedger, RateLimitPolicy, RetainedLiquidityFloor, Tick, Timestamp,
    WindowConfig,
};
use sluice_settlement::{AssetMover, EffectId, SettlementStrategy, SettlementTarget};

use crate::error::BreakerError;
use crate::events::BreakerEvent;

/// Ledger type used by the breaker: thresholds plus the asset's strategy.
pub type AssetLedger = LiquidityLedger<Arc<dyn SettlementStrategy>>;

/// Result of a recorded outflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutflowOutcome {
    /// The outflow breached its floor and was diverted to settlement.
    pub triggered: bool,
    /// Effect registered with the settlement strategy, if diverted.
    pub effect_id: Option<EffectId>,
}

impl OutflowOutcome {
    fn delivered() -> Self {
        Self {
            triggered: false,
            effect_id: None,
        }
    }

    fn diverted(effect_id: EffectId) -> Self {
        Self {
            triggered: true,
            effect_id: Some(effect_id),
        }
    }
}

/// Rate-limiting circuit breaker over a pool of custodied assets.
pub struct CircuitBreaker {
    admin: AccountId,
    custody: AccountId,
    window: WindowConfig,
    state: BreakerState,
    ledgers: HashMap<AssetId, AssetLedger>,
    policy: Box<dyn RateLimitPolicy>,
    clock: Arc<dyn Clock>,
    mover: Arc<dyn AssetMover>,
    events: Vec<BreakerEvent>,
}

impl CircuitBreaker {
    /// Create an operational breaker using the retained-liquidity floor policy.
    pub fn new(
        admin: AccountId,
        custody: AccountId,
        window: WindowConfig,
        clock: Arc<dyn Clock>,
        mover: Arc<dyn AssetMover>,
    ) -> Result<Self, BreakerError> {
        window.validate()?;
        tracing::info!(
            %admin,
            %custody,
            period = window.period_secs,
            tick_length = window.tick_length_secs,
            cooldown = window.cooldown_secs,
            clock = clock.name(),
            "circuit breaker created"
        );
        Ok(Self {
            admin,
            custody,
            window,
            state: BreakerState::new(window.cooldown_secs),
            ledgers: HashMap::new(),
            policy: Box::new(RetainedLiquidityFloor),
            clock,
            mover,
            events: Vec::new(),
        })
    }

    /// Replace the rate-limit policy.
    pub fn with_policy(mut self, policy: impl RateLimitPolicy + 'static) -> Self {
        tracing::info!(policy = policy.policy_id(), "rate-limit policy installed");
        self.policy = Box::new(policy);
        self
    }

    // ---- Guards ----

    fn ensure_admin(&self, caller: &AccountId) -> Result<(), BreakerError> {
        if caller != &self.admin {
            return Err(BreakerError::NotAdmin);
        }
        Ok(())
    }

    fn ensure_operational(&self) -> Result<(), BreakerError> {
        if !self.state.is_operational() {
            return Err(BreakerError::NotOperational);
        }
        Ok(())
    }

    fn ensure_protected(&self, caller: &AccountId) -> Result<(), BreakerError> {
        if !self.state.is_protected(caller) {
            return Err(BreakerError::NotProtectedCaller);
        }
        Ok(())
    }

    fn emit(&mut self, event: BreakerEvent) {
        tracing::info!(event = event.name(), details = ?event, "breaker event");
        self.events.push(event);
    }

    // ---- Admin ----

    /// Start tracking `asset`. Registering the same asset twice fails.
    pub fn register_asset(
        &mut self,
        caller: &AccountId,
        asset: AssetId,
        min_retained_bps: u32,
        begin_threshold: u128,
        settlement: Arc<dyn SettlementStrategy>,
    ) -> Result<(), BreakerError> {
        self.ensure_admin(caller)?;
        self.ensure_operational()?;

        let strategy_id = settlement.strategy_id().to_string();
        match self.ledgers.get_mut(&asset) {
            Some(existing) => existing.init(min_retained_bps, begin_threshold, settlement)?,
            None => {
                let mut ledger = AssetLedger::new();
                ledger.init(min_retained_bps, begin_threshold, settlement)?;
                self.ledgers.insert(asset.clone(), ledger);
            }
        }

        self.emit(BreakerEvent::AssetRegistered {
            asset,
            min_retained_bps,
            begin_threshold,
            settlement: strategy_id,
        });
        Ok(())
    }

    /// Replace the thresholds and strategy of a registered asset.
    pub fn update_asset_params(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        min_retained_bps: u32,
        begin_threshold: u128,
        settlement: Arc<dyn SettlementStrategy>,
    ) -> Result<(), BreakerError> {
        self.ensure_admin(caller)?;
        self.ensure_operational()?;

        let now = self.clock.now();
        let strategy_id = settlement.strategy_id().to_string();
        let ledger = self
            .ledgers
            .get_mut(asset)
            .ok_or(CoreError::NotInitialized)?;
        ledger.update_params(
            min_retained_bps,
            begin_threshold,
            settlement,
            now,
            self.window.period_secs,
        )?;

        self.emit(BreakerEvent::AssetUpdated {
            asset: asset.clone(),
            min_retained_bps,
            begin_threshold,
            settlement: strategy_id,
        });
        Ok(())
    }

    /// Kill switch. Halting is permanent; asking to re-open a halted breaker
    /// fails with [`CoreError::HaltIsFinal`].
    pub fn set_operational_status(
        &mut self,
        caller: &AccountId,
        operational: bool,
    ) -> Result<(), BreakerError> {
        self.ensure_admin(caller)?;
        let was = self.state.is_operational();
        self.state.set_operational(operational)?;
        if was != operational {
            tracing::warn!("circuit breaker halted");
            self.emit(BreakerEvent::OperationalStatusChanged { operational });
        }
        Ok(())
    }

    /// Allow `callers` to record inflows and outflows.
    pub fn add_protected_callers(
        &mut self,
        caller: &AccountId,
        callers: &[AccountId],
    ) -> Result<(), BreakerError> {
        self.ensure_admin(caller)?;
        for protected in callers {
            self.state.add_protected(protected.clone());
        }
        self.emit(BreakerEvent::ProtectedCallersChanged {
            callers: callers.to_vec(),
            protected: true,
        });
        Ok(())
    }

    pub fn remove_protected_callers(
        &mut self,
        caller: &AccountId,
        callers: &[AccountId],
    ) -> Result<(), BreakerError> {
        self.ensure_admin(caller)?;
        for protected in callers {
            self.state.remove_protected(protected);
        }
        self.emit(BreakerEvent::ProtectedCallersChanged {
            callers: callers.to_vec(),
            protected: false,
        });
        Ok(())
    }

    /// Hand admin rights to `new_admin`.
    pub fn set_admin(&mut self, caller: &AccountId, new_admin: AccountId) -> Result<(), BreakerError> {
        self.ensure_admin(caller)?;
        self.admin = new_admin.clone();
        self.emit(BreakerEvent::AdminChanged { admin: new_admin });
        Ok(())
    }

    // ---- Flows ----

    /// Record funds entering the pool. Inflows never trigger the breaker.
    pub fn record_inflow(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        amount: u128,
    ) -> Result<(), BreakerError> {
        self.ensure_operational()?;
        self.ensure_protected(caller)?;

        let now = self.clock.now();
        let delta = to_signed(amount)?;
        if let Some(ledger) = self.ledgers.get_mut(asset) {
            ledger.apply_delta(
                delta,
                now,
                self.window.period_secs,
                self.window.tick_length_secs,
            )?;
        }

        self.emit(BreakerEvent::AssetInflow {
            asset: asset.clone(),
            amount,
            timestamp: now,
        });
        Ok(())
    }

    /// Record funds leaving the pool and release them.
    ///
    /// The `amount` must already sit in the breaker's custody account. If the
    /// asset's status after the delta is `Triggered` and no grace period is
    /// active, the latch is armed and the funds go to the asset's settlement
    /// strategy; otherwise they go straight to `recipient`. Each call is
    /// judged on its own: an armed latch does not divert later outflows.
    pub fn record_outflow(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        amount: u128,
        recipient: &AccountId,
        payload: &[u8],
    ) -> Result<OutflowOutcome, BreakerError> {
        self.ensure_operational()?;
        self.ensure_protected(caller)?;

        let now = self.clock.now();
        let Some(ledger) = self.ledgers.get_mut(asset).filter(|l| l.is_initialized()) else {
            self.mover.transfer(asset, &self.custody, recipient, amount)?;
            self.emit(BreakerEvent::AssetOutflow {
                asset: asset.clone(),
                amount,
                recipient: recipient.clone(),
                status: LimitStatus::Uninitialized,
                timestamp: now,
            });
            return Ok(OutflowOutcome::delivered());
        };

        let strategy = ledger
            .settlement()
            .cloned()
            .ok_or(CoreError::NotInitialized)?;
        let delta = to_signed(amount)?;
        let ledger_before = ledger.clone();
        let state_before = self.state.clone();

        if let Err(e) = ledger.apply_delta(
            -delta,
            now,
            self.window.period_secs,
            self.window.tick_length_secs,
        ) {
            *ledger = ledger_before;
            return Err(e.into());
        }
        let status = ledger.status_with(self.policy.as_ref());

        let result = match status {
            LimitStatus::Triggered if self.state.in_grace_period(now) => {
                tracing::info!(%asset, amount, "breach suppressed by grace period");
                self.deliver(asset, amount, recipient)
            }
            LimitStatus::Triggered => self.divert(asset, amount, recipient, payload, &strategy, now),
            _ => self.deliver(asset, amount, recipient),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.ledgers.insert(asset.clone(), ledger_before);
                self.state = state_before;
                tracing::warn!(%asset, amount, error = %e, "outflow rolled back");
                return Err(e);
            }
        };

        self.emit(BreakerEvent::AssetOutflow {
            asset: asset.clone(),
            amount,
            recipient: recipient.clone(),
            status,
            timestamp: now,
        });
        if let Some(effect_id) = outcome.effect_id {
            self.emit(BreakerEvent::AssetRateLimitBreached {
                asset: asset.clone(),
                amount,
                effect_id,
                timestamp: now,
            });
        }
        Ok(outcome)
    }

    fn deliver(
        &self,
        asset: &AssetId,
        amount: u128,
        recipient: &AccountId,
    ) -> Result<OutflowOutcome, BreakerError> {
        self.mover.transfer(asset, &self.custody, recipient, amount)?;
        Ok(OutflowOutcome::delivered())
    }

    fn divert(
        &mut self,
        asset: &AssetId,
        amount: u128,
        recipient: &AccountId,
        payload: &[u8],
        strategy: &Arc<dyn SettlementStrategy>,
        now: Timestamp,
    ) -> Result<OutflowOutcome, BreakerError> {
        self.state.record_breach(now)?;

        let target = SettlementTarget::new(asset.clone(), recipient.clone());
        let strategy_custody = strategy.custody_account();
        self.mover
            .transfer(asset, &self.custody, strategy_custody, amount)?;

        match strategy.prevent(&target, amount, payload) {
            Ok(effect_id) => {
                tracing::warn!(
                    %asset,
                    amount,
                    %recipient,
                    strategy = strategy.strategy_id(),
                    %effect_id,
                    "rate limit breached, outflow diverted"
                );
                Ok(OutflowOutcome::diverted(effect_id))
            }
            Err(cause) => match self
                .mover
                .transfer(asset, strategy_custody, &self.custody, amount)
            {
                Ok(()) => Err(cause.into()),
                Err(undo) => {
                    tracing::error!(
                        %asset,
                        amount,
                        %cause,
                        %undo,
                        stranded_in = %strategy_custody,
                        "settlement failed and diverted funds could not be returned"
                    );
                    Err(BreakerError::CompensationFailed {
                        cause,
                        undo,
                        stranded_in: strategy_custody.clone(),
                        amount,
                    })
                }
            },
        }
    }

    // ---- Overrides ----

    /// Set or clear the manual bypass of one asset's limit. Returns the
    /// previous flag value.
    pub fn override_limiter_flag(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        value: bool,
    ) -> Result<bool, BreakerError> {
        self.ensure_admin(caller)?;
        self.ensure_operational()?;

        let ledger = self
            .ledgers
            .get_mut(asset)
            .ok_or_else(|| BreakerError::AssetNotRegistered(asset.clone()))?;
        let previous = ledger.set_overridden(value)?;

        self.emit(BreakerEvent::LimiterOverridden {
            asset: asset.clone(),
            overridden: value,
        });
        Ok(previous)
    }

    /// Admin clear of the global latch.
    pub fn override_rate_limit(&mut self, caller: &AccountId) -> Result<(), BreakerError> {
        self.ensure_admin(caller)?;
        let now = self.clock.now();
        let grace_before = self.state.grace_period_end();
        self.state.clear_by_admin(self.window.period_secs)?;

        self.emit(BreakerEvent::RateLimitOverridden {
            expired: false,
            timestamp: now,
        });
        if let Some(end) = self.state.grace_period_end().filter(|e| Some(*e) != grace_before) {
            self.emit(BreakerEvent::GracePeriodStarted { end });
        }
        Ok(())
    }

    /// Permissionless clear of the global latch once the cooldown has elapsed.
    pub fn override_expired_rate_limit(&mut self) -> Result<(), BreakerError> {
        let now = self.clock.now();
        self.state.clear_expired(now)?;
        self.emit(BreakerEvent::RateLimitOverridden {
            expired: true,
            timestamp: now,
        });
        Ok(())
    }

    /// Suppress triggers until `end` (inclusive).
    pub fn start_grace_period(&mut self, caller: &AccountId, end: Timestamp) -> Result<(), BreakerError> {
        self.ensure_admin(caller)?;
        let now = self.clock.now();
        self.state.start_grace_period(end, now)?;
        self.emit(BreakerEvent::GracePeriodStarted { end });
        Ok(())
    }

    // ---- Maintenance ----

    /// Permissionless compaction of up to `max_iterations` expired nodes.
    /// Returns the number of nodes evicted.
    pub fn compact_backlog(
        &mut self,
        asset: &AssetId,
        max_iterations: usize,
    ) -> Result<usize, BreakerError> {
        self.ensure_operational()?;

        let now = self.clock.now();
        let ledger = self
            .ledgers
            .get_mut(asset)
            .ok_or_else(|| BreakerError::AssetNotRegistered(asset.clone()))?;
        let evicted = ledger.sync(now, self.window.period_secs, max_iterations);
        let remaining = ledger.len();

        self.emit(BreakerEvent::BacklogCompacted {
            asset: asset.clone(),
            evicted,
            remaining,
        });
        Ok(evicted)
    }

    // ---- Queries ----

    pub fn is_asset_rate_limited(&self, asset: &AssetId) -> bool {
        self.asset_status(asset) == LimitStatus::Triggered
    }

    pub fn is_system_rate_limited(&self) -> bool {
        self.state.is_rate_limited()
    }

    pub fn is_operational(&self) -> bool {
        self.state.is_operational()
    }

    pub fn is_in_grace_period(&self) -> bool {
        self.state.in_grace_period(self.clock.now())
    }

    /// Current status of `asset` under the installed policy.
    pub fn asset_status(&self, asset: &AssetId) -> LimitStatus {
        self.ledgers
            .get(asset)
            .map_or(LimitStatus::Uninitialized, |l| l.status_with(self.policy.as_ref()))
    }

    /// The node stored at `tick` and the tick that follows it.
    pub fn ledger_node(&self, asset: &AssetId, tick: Tick) -> Option<LedgerNode> {
        self.ledgers.get(asset)?.node(tick)
    }

    pub fn ledger_snapshot(&self, asset: &AssetId) -> Option<LedgerSnapshot> {
        self.ledgers
            .get(asset)
            .map(|l| l.snapshot_with(self.policy.as_ref()))
    }

    pub fn ledger(&self, asset: &AssetId) -> Option<&AssetLedger> {
        self.ledgers.get(asset)
    }

    /// Registered assets, in no particular order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.ledgers.keys()
    }

    pub fn state(&self) -> &BreakerState {
        &self.state
    }

    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    /// Account outflow funds must be placed in before `record_outflow`.
    pub fn custody_account(&self) -> &AccountId {
        &self.custody
    }

    pub fn window(&self) -> &WindowConfig {
        &self.window
    }

    pub fn policy_id(&self) -> &str {
        self.policy.policy_id()
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<BreakerEvent> {
        std::mem::take(&mut self.events)
    }
}
