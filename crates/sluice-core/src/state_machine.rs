use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::CoreError;
use crate::types::{AccountId, Timestamp};

/// The global rate-limit latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Latch {
    /// No breach since the last clear.
    Normal,
    /// At least one asset breached its floor; cleared only by an override.
    RateLimited,
}

impl fmt::Display for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::RateLimited => write!(f, "RateLimited"),
        }
    }
}

/// Events that move the latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchEvent {
    /// An asset breached its retained-liquidity floor.
    Breach,
    /// An admin cleared the latch immediately.
    AdminOverride,
    /// Anyone cleared the latch after the cooldown.
    CooldownExpired,
}

/// Transition table for the latch.
///
/// Valid transitions:
/// - Normal → RateLimited (Breach)
/// - RateLimited → RateLimited (Breach, re-arms the cooldown)
/// - RateLimited → Normal (AdminOverride)
/// - RateLimited → Normal (CooldownExpired)
pub struct LatchMachine;

impl LatchMachine {
    /// Attempt a latch transition.
    pub fn transition(current: Latch, event: LatchEvent) -> Result<Latch, CoreError> {
        let next = match (current, event) {
            (_, LatchEvent::Breach) => Latch::RateLimited,
            (Latch::RateLimited, LatchEvent::AdminOverride) => Latch::Normal,
            (Latch::RateLimited, LatchEvent::CooldownExpired) => Latch::Normal,
            (Latch::Normal, LatchEvent::AdminOverride | LatchEvent::CooldownExpired) => {
                return Err(CoreError::NotRateLimited);
            }
        };

        tracing::debug!(from = %current, to = %next, event = ?event, "latch transition");
        Ok(next)
    }

    pub fn can_transition(current: Latch, event: LatchEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}

/// Global breaker state: kill switch, latch, timers and protected callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerState {
    operational: bool,
    latch: Latch,
    last_trigger_time: Option<Timestamp>,
    cooldown_period: u64,
    grace_period_end: Option<Timestamp>,
    protected_callers: HashSet<AccountId>,
}

impl BreakerState {
    /// Operational, latch clear, no grace period, no protected callers.
    pub fn new(cooldown_period: u64) -> Self {
        Self {
            operational: true,
            latch: Latch::Normal,
            last_trigger_time: None,
            cooldown_period,
            grace_period_end: None,
            protected_callers: HashSet::new(),
        }
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn is_rate_limited(&self) -> bool {
        self.latch == Latch::RateLimited
    }

    pub fn latch(&self) -> Latch {
        self.latch
    }

    pub fn last_trigger_time(&self) -> Option<Timestamp> {
        self.last_trigger_time
    }

    pub fn cooldown_period(&self) -> u64 {
        self.cooldown_period
    }

    pub fn grace_period_end(&self) -> Option<Timestamp> {
        self.grace_period_end
    }

    /// Triggers are suppressed while `now <= grace_period_end`.
    pub fn in_grace_period(&self, now: Timestamp) -> bool {
        self.grace_period_end.is_some_and(|end| now <= end)
    }

    /// Kill switch. There is no way back to operational.
    pub fn halt(&mut self) {
        self.operational = false;
    }

    /// Request an operational status. Re-opening a halted breaker fails.
    pub fn set_operational(&mut self, operational: bool) -> Result<(), CoreError> {
        match (self.operational, operational) {
            (false, true) => Err(CoreError::HaltIsFinal),
            (_, false) => {
                self.halt();
                Ok(())
            }
            (true, true) => Ok(()),
        }
    }

    /// Arm the latch and stamp the trigger time.
    pub fn record_breach(&mut self, now: Timestamp) -> Result<(), CoreError> {
        self.latch = LatchMachine::transition(self.latch, LatchEvent::Breach)?;
        self.last_trigger_time = Some(now);
        Ok(())
    }

    /// Admin clear. The grace period is extended to `last_trigger + window`
    /// so the breach that armed the latch does not immediately re-arm it.
    pub fn clear_by_admin(&mut self, window_period: u64) -> Result<(), CoreError> {
        self.latch = LatchMachine::transition(self.latch, LatchEvent::AdminOverride)?;
        if let Some(last) = self.last_trigger_time {
            let end = last.saturating_add(window_period);
            self.grace_period_end = Some(self.grace_period_end.map_or(end, |g| g.max(end)));
        }
        Ok(())
    }

    /// Permissionless clear, allowed once the cooldown has elapsed.
    pub fn clear_expired(&mut self, now: Timestamp) -> Result<(), CoreError> {
        if !self.is_rate_limited() {
            return Err(CoreError::NotRateLimited);
        }
        let ready_at = self
            .last_trigger_time
            .unwrap_or(0)
            .saturating_add(self.cooldown_period);
        if now < ready_at {
            return Err(CoreError::CooldownNotElapsed { ready_at, now });
        }
        self.latch = LatchMachine::transition(self.latch, LatchEvent::CooldownExpired)?;
        Ok(())
    }

    /// Suppress triggers until `end` (inclusive).
    pub fn start_grace_period(&mut self, end: Timestamp, now: Timestamp) -> Result<(), CoreError> {
        if end <= now {
            return Err(CoreError::InvalidGracePeriodEnd { end, now });
        }
        self.grace_period_end = Some(end);
        Ok(())
    }

    pub fn is_protected(&self, caller: &AccountId) -> bool {
        self.protected_callers.contains(caller)
    }

    pub fn add_protected(&mut self, caller: AccountId) -> bool {
        self.protected_callers.insert(caller)
    }

    pub fn remove_protected(&mut self, caller: &AccountId) -> bool {
        self.protected_callers.remove(caller)
    }

    pub fn protected_callers(&self) -> impl Iterator<Item = &AccountId> {
        self.protected_callers.iter()
    }
}
