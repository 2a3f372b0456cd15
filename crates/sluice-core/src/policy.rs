//! Rate-limit policies.
//!
//! A policy judges the settled baseline (`total_all_time`) against the
//! provisional in-window movement (`total_in_window`). Policies are pure and
//! hold no ledger state, so the breaker can swap them without touching the
//! accounting.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{SignedAmount, BPS_DENOMINATOR};

/// Status of one asset's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitStatus {
    /// The asset was never registered.
    Uninitialized,
    /// Not enough settled history to judge.
    Inactive,
    /// Within limits (or manually overridden).
    Ok,
    /// Projected liquidity falls below the configured floor.
    Triggered,
}

impl fmt::Display for LimitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Inactive => write!(f, "Inactive"),
            Self::Ok => write!(f, "Ok"),
            Self::Triggered => write!(f, "Triggered"),
        }
    }
}

/// The numbers a policy sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyInput {
    pub total_all_time: SignedAmount,
    pub total_in_window: SignedAmount,
    pub min_retained_bps: u32,
    pub begin_threshold: u128,
}

impl PolicyInput {
    /// Whether the settled history is below the minimum-activity gate.
    pub fn below_begin_threshold(&self) -> bool {
        match u128::try_from(self.total_all_time) {
            Ok(total) => total < self.begin_threshold,
            Err(_) => true,
        }
    }
}

/// Evaluates ledger totals against configured thresholds.
///
/// Implementations only return `Inactive`, `Ok` or `Triggered`; the ledger
/// itself answers `Uninitialized` and applies manual overrides.
pub trait RateLimitPolicy: Send + Sync {
    /// Judge the given totals.
    fn evaluate(&self, input: &PolicyInput) -> LimitStatus;

    /// Short identifier used in logs.
    fn policy_id(&self) -> &str;
}

/// Percentage-of-baseline floor with a minimum-activity gate.
///
/// Triggers iff `total_all_time + total_in_window` is strictly below
/// `total_all_time * min_retained_bps / 10_000` (truncating division).
#[derive(Debug, Clone, Copy, Default)]
pub struct RetainedLiquidityFloor;

impl RetainedLiquidityFloor {
    /// Minimum liquidity that must remain, computed on the settled baseline.
    ///
    /// Equal to `total * bps / 10_000` with truncation for any non-negative
    /// `total`, but split so the product cannot overflow.
    pub fn floor(total_all_time: SignedAmount, min_retained_bps: u32) -> SignedAmount {
        let bps = SignedAmount::from(min_retained_bps);
        let denom = SignedAmount::from(BPS_DENOMINATOR);
        let whole = total_all_time / denom;
        let rem = total_all_time % denom;
        whole * bps + rem * bps / denom
    }
}

impl RateLimitPolicy for RetainedLiquidityFloor {
    fn evaluate(&self, input: &PolicyInput) -> LimitStatus {
        if input.below_begin_threshold() {
            return LimitStatus::Inactive;
        }
        let projected = input.total_all_time.saturating_add(input.total_in_window);
        let floor = Self::floor(input.total_all_time, input.min_retained_bps);
        if projected < floor {
            LimitStatus::Triggered
        } else {
            LimitStatus::Ok
        }
    }

    fn policy_id(&self) -> &str {
        "retained-liquidity-floor"
    }
}

/// Fixed-notional cap on net outflow inside the window.
///
/// Shares the minimum-activity gate with [`RetainedLiquidityFloor`] but
/// ignores `min_retained_bps`.
#[derive(Debug, Clone, Copy)]
pub struct NetOutflowCap {
    pub max_net_outflow: u128,
}

impl NetOutflowCap {
    pub fn new(max_net_outflow: u128) -> Self {
        Self { max_net_outflow }
    }
}

impl RateLimitPolicy for NetOutflowCap {
    fn evaluate(&self, input: &PolicyInput) -> LimitStatus {
        if input.below_begin_threshold() {
            return LimitStatus::Inactive;
        }
        if input.total_in_window >= 0 {
            return LimitStatus::Ok;
        }
        if input.total_in_window.unsigned_abs() > self.max_net_outflow {
            LimitStatus::Triggered
        } else {
            LimitStatus::Ok
        }
    }

    fn policy_id(&self) -> &str {
        "net-outflow-cap"
    }
}
