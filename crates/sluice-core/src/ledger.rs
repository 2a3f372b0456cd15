//! Per-asset sliding-window liquidity ledger.
//!
//! Deltas are bucketed into ticks and kept in a tick-ordered sequence from
//! `head` (oldest) to `tail` (newest). Nodes older than the window period are
//! folded into the settled `total_all_time` by [`LiquidityLedger::sync`],
//! either implicitly on the next delta or through an explicit compaction
//! call with a bounded iteration budget.
//!
//! Invariant: `total_all_time + total_in_window` equals the sum of every
//! delta ever applied, and `total_in_window` equals the sum of the retained
//! nodes.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::CoreError;
use crate::policy::{LimitStatus, PolicyInput, RateLimitPolicy, RetainedLiquidityFloor};
use crate::types::{LedgerNode, SignedAmount, Tick, Timestamp, BPS_DENOMINATOR};

/// Registration parameters of a ledger.
#[derive(Debug, Clone)]
pub struct LedgerParams<S> {
    /// Minimum fraction of settled liquidity to retain, in bps (1..=10000).
    pub min_retained_bps: u32,
    /// Settled liquidity required before the policy is evaluated at all.
    pub begin_threshold: u128,
    /// Strategy that receives diverted outflows for this asset.
    pub settlement: S,
}

/// Serializable point-in-time view of a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub status: LimitStatus,
    pub min_retained_bps: u32,
    pub begin_threshold: u128,
    pub total_all_time: SignedAmount,
    pub total_in_window: SignedAmount,
    pub head: Option<Tick>,
    pub tail: Option<Tick>,
    pub node_count: usize,
    pub overridden: bool,
}

/// Sliding-window accounting for one asset.
///
/// `S` is the settlement reference stored alongside the thresholds; the
/// ledger never calls into it.
#[derive(Debug, Clone)]
pub struct LiquidityLedger<S> {
    params: Option<LedgerParams<S>>,
    total_all_time: SignedAmount,
    total_in_window: SignedAmount,
    window: VecDeque<(Tick, SignedAmount)>,
    overridden: bool,
}

impl<S> Default for LiquidityLedger<S> {
    fn default() -> Self {
        Self {
            params: None,
            total_all_time: 0,
            total_in_window: 0,
            window: VecDeque::new(),
            overridden: false,
        }
    }
}

fn validate_threshold(min_retained_bps: u32) -> Result<(), CoreError> {
    if min_retained_bps == 0 || min_retained_bps > BPS_DENOMINATOR {
        return Err(CoreError::InvalidThreshold(min_retained_bps));
    }
    Ok(())
}

impl<S> LiquidityLedger<S> {
    /// Create an uninitialized ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register thresholds and settlement. One-time only.
    pub fn init(
        &mut self,
        min_retained_bps: u32,
        begin_threshold: u128,
        settlement: S,
    ) -> Result<(), CoreError> {
        validate_threshold(min_retained_bps)?;
        if self.params.is_some() {
            return Err(CoreError::AlreadyInitialized);
        }
        self.params = Some(LedgerParams {
            min_retained_bps,
            begin_threshold,
            settlement,
        });
        Ok(())
    }

    /// Replace thresholds and settlement, after bringing the window up to date.
    pub fn update_params(
        &mut self,
        min_retained_bps: u32,
        begin_threshold: u128,
        settlement: S,
        now: Timestamp,
        window_period: u64,
    ) -> Result<(), CoreError> {
        validate_threshold(min_retained_bps)?;
        if self.params.is_none() {
            return Err(CoreError::NotInitialized);
        }
        self.sync(now, window_period, usize::MAX);
        self.params = Some(LedgerParams {
            min_retained_bps,
            begin_threshold,
            settlement,
        });
        Ok(())
    }

    /// Record a signed delta at `now`.
    ///
    /// Uninitialized ledgers ignore deltas so unregistered assets flow freely.
    /// Expired nodes are folded first when the head has aged out. A `now`
    /// earlier than the tail tick merges into the tail. All arithmetic is
    /// checked before anything is written, so a failed delta leaves the
    /// ledger untouched.
    pub fn apply_delta(
        &mut self,
        amount: SignedAmount,
        now: Timestamp,
        window_period: u64,
        tick_length: u64,
    ) -> Result<(), CoreError> {
        if self.params.is_none() {
            return Ok(());
        }

        let (expired, folded) = match self.window.front() {
            Some(&(head, _)) if head.age(now) >= window_period => {
                self.expired_prefix(now, window_period, usize::MAX)?
            }
            _ => (0, 0),
        };
        let total_all_time = self
            .total_all_time
            .checked_add(folded)
            .ok_or(CoreError::AmountOverflow)?;
        let total_in_window = self
            .total_in_window
            .checked_sub(folded)
            .and_then(|t| t.checked_add(amount))
            .ok_or(CoreError::AmountOverflow)?;
        total_all_time
            .checked_add(total_in_window)
            .ok_or(CoreError::AmountOverflow)?;

        let current = Tick::from_timestamp(now, tick_length);
        let tail = self
            .window
            .back()
            .filter(|_| expired < self.window.len())
            .copied();
        let merged = match tail {
            Some((tail, tail_amount)) if current <= tail => {
                if current < tail {
                    tracing::warn!(tick = %current, %tail, "delta older than tail, merging into tail");
                }
                Some(
                    tail_amount
                        .checked_add(amount)
                        .ok_or(CoreError::AmountOverflow)?,
                )
            }
            _ => None,
        };

        if expired > 0 {
            self.window.drain(..expired);
            tracing::debug!(evicted = expired, remaining = self.window.len(), folded, "ledger window compacted");
        }
        self.total_all_time = total_all_time;
        self.total_in_window = total_in_window;
        match (merged, self.window.back_mut()) {
            (Some(sum), Some((_, node_amount))) => *node_amount = sum,
            _ => {
                self.window.push_back((current, amount));
                tracing::debug!(tick = %current, amount, "ledger node appended");
            }
        }
        Ok(())
    }

    /// Count and sum of the leading nodes that have aged out at `now`.
    fn expired_prefix(
        &self,
        now: Timestamp,
        window_period: u64,
        max_iterations: usize,
    ) -> Result<(usize, SignedAmount), CoreError> {
        let mut folded: SignedAmount = 0;
        let mut count = 0;
        for &(tick, amount) in self.window.iter().take(max_iterations) {
            if tick.age(now) < window_period {
                break;
            }
            folded = folded.checked_add(amount).ok_or(CoreError::AmountOverflow)?;
            count += 1;
        }
        Ok((count, folded))
    }

    /// Fold up to `max_iterations` expired nodes into the settled total.
    ///
    /// A node is expired once `now - tick >= window_period`. Returns the
    /// number of nodes evicted.
    pub fn sync(&mut self, now: Timestamp, window_period: u64, max_iterations: usize) -> usize {
        let mut folded: SignedAmount = 0;
        let mut evicted = 0;
        while evicted < max_iterations {
            match self.window.front() {
                Some(&(tick, amount)) if tick.age(now) >= window_period => {
                    folded += amount;
                    self.window.pop_front();
                    evicted += 1;
                }
                _ => break,
            }
        }
        self.total_all_time += folded;
        self.total_in_window -= folded;
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.window.len(), folded, "ledger window compacted");
        }
        evicted
    }

    /// Status under the default retained-liquidity floor.
    pub fn status(&self) -> LimitStatus {
        self.status_with(&RetainedLiquidityFloor)
    }

    /// Status under an arbitrary policy; manual overrides take precedence.
    pub fn status_with<P: RateLimitPolicy + ?Sized>(&self, policy: &P) -> LimitStatus {
        let Some(input) = self.policy_input() else {
            return LimitStatus::Uninitialized;
        };
        if self.overridden {
            return LimitStatus::Ok;
        }
        policy.evaluate(&input)
    }

    /// The values a policy judges, if initialized.
    pub fn policy_input(&self) -> Option<PolicyInput> {
        self.params.as_ref().map(|params| PolicyInput {
            total_all_time: self.total_all_time,
            total_in_window: self.total_in_window,
            min_retained_bps: params.min_retained_bps,
            begin_threshold: params.begin_threshold,
        })
    }

    /// Set the manual bypass flag, returning the previous value.
    pub fn set_overridden(&mut self, value: bool) -> Result<bool, CoreError> {
        if self.params.is_none() {
            return Err(CoreError::NotInitialized);
        }
        Ok(std::mem::replace(&mut self.overridden, value))
    }

    pub fn is_initialized(&self) -> bool {
        self.params.is_some()
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    pub fn params(&self) -> Option<&LedgerParams<S>> {
        self.params.as_ref()
    }

    /// The settlement reference registered with this ledger.
    pub fn settlement(&self) -> Option<&S> {
        self.params.as_ref().map(|p| &p.settlement)
    }

    pub fn total_all_time(&self) -> SignedAmount {
        self.total_all_time
    }

    pub fn total_in_window(&self) -> SignedAmount {
        self.total_in_window
    }

    /// Oldest retained tick.
    pub fn head(&self) -> Option<Tick> {
        self.window.front().map(|&(tick, _)| tick)
    }

    /// Newest retained tick.
    pub fn tail(&self) -> Option<Tick> {
        self.window.back().map(|&(tick, _)| tick)
    }

    /// Look up the node stored at `tick`.
    pub fn node(&self, tick: Tick) -> Option<LedgerNode> {
        let idx = self.window.binary_search_by_key(&tick, |&(t, _)| t).ok()?;
        Some(LedgerNode {
            next_tick: self.window.get(idx + 1).map(|&(t, _)| t),
            amount: self.window[idx].1,
        })
    }

    /// Retained nodes from head to tail.
    pub fn nodes(&self) -> impl Iterator<Item = (Tick, SignedAmount)> + '_ {
        self.window.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Point-in-time view, evaluated under `policy`.
    pub fn snapshot_with<P: RateLimitPolicy + ?Sized>(&self, policy: &P) -> LedgerSnapshot {
        let (min_retained_bps, begin_threshold) = self
            .params
            .as_ref()
            .map(|p| (p.min_retained_bps, p.begin_threshold))
            .unwrap_or((0, 0));
        LedgerSnapshot {
            status: self.status_with(policy),
            min_retained_bps,
            begin_threshold,
            total_all_time: self.total_all_time,
            total_in_window: self.total_in_window,
            head: self.head(),
            tail: self.tail(),
            node_count: self.window.len(),
            overridden: self.overridden,
        }
    }
}
