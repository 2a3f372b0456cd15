use serde::{Deserialize, Serialize};
use sluice_core::{AccountId, AssetId, LimitStatus, Timestamp};
use sluice_settlement::EffectId;

/// Notifications emitted by the breaker after each committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BreakerEvent {
    AssetRegistered {
        asset: AssetId,
        min_retained_bps: u32,
        #[serde(with = "sluice_core::wide_amount")]
        begin_threshold: u128,
        settlement: String,
    },
    AssetUpdated {
        asset: AssetId,
        min_retained_bps: u32,
        #[serde(with = "sluice_core::wide_amount")]
        begin_threshold: u128,
        settlement: String,
    },
    AssetInflow {
        asset: AssetId,
        #[serde(with = "sluice_core::wide_amount")]
        amount: u128,
        timestamp: Timestamp,
    },
    AssetOutflow {
        asset: AssetId,
        #[serde(with = "sluice_core::wide_amount")]
        amount: u128,
        recipient: AccountId,
        status: LimitStatus,
        timestamp: Timestamp,
    },
    /// An outflow breached its floor and was handed to the settlement strategy.
    AssetRateLimitBreached {
        asset: AssetId,
        #[serde(with = "sluice_core::wide_amount")]
        amount: u128,
        effect_id: EffectId,
        timestamp: Timestamp,
    },
    RateLimitOverridden {
        /// True for the permissionless clear after the cooldown.
        expired: bool,
        timestamp: Timestamp,
    },
    GracePeriodStarted {
        end: Timestamp,
    },
    OperationalStatusChanged {
        operational: bool,
    },
    LimiterOverridden {
        asset: AssetId,
        overridden: bool,
    },
    BacklogCompacted {
        asset: AssetId,
        evicted: usize,
        remaining: usize,
    },
    AdminChanged {
        admin: AccountId,
    },
    ProtectedCallersChanged {
        callers: Vec<AccountId>,
        protected: bool,
    },
}

impl BreakerEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AssetRegistered { .. } => "asset_registered",
            Self::AssetUpdated { .. } => "asset_updated",
            Self::AssetInflow { .. } => "asset_inflow",
            Self::AssetOutflow { .. } => "asset_outflow",
            Self::AssetRateLimitBreached { .. } => "asset_rate_limit_breached",
            Self::RateLimitOverridden { .. } => "rate_limit_overridden",
            Self::GracePeriodStarted { .. } => "grace_period_started",
            Self::OperationalStatusChanged { .. } => "operational_status_changed",
            Self::LimiterOverridden { .. } => "limiter_overridden",
            Self::BacklogCompacted { .. } => "backlog_compacted",
            Self::AdminChanged { .. } => "admin_changed",
            Self::ProtectedCallersChanged { .. } => "protected_callers_changed",
        }
    }
}
