//! Scenario replay against an in-memory breaker.
//!
//! A scenario is a JSON document with an optional start time and a list of
//! steps. Time only moves on `advance` steps, so replays are deterministic.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use sluice_breaker::{BreakerError, CircuitBreaker};
use sluice_core::{AccountId, AssetId, BreakerConfig, Clock, ManualClock, Timestamp};
use sluice_settlement::{
    AssetMover, DelayedSettlement, InMemoryCustody, RejectSettlement, SettlementRegistry,
    SettlementTarget,
};

/// Admin of the simulated breaker.
pub const ADMIN: &str = "admin";
/// Protected caller every flow is recorded through.
pub const VAULT: &str = "vault";
/// Breaker custody account outflows are staged in.
pub const BREAKER_CUSTODY: &str = "breaker";

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Initial clock value, in seconds since the UNIX epoch.
    #[serde(default = "default_start")]
    pub start: Timestamp,
    pub steps: Vec<Step>,
}

fn default_start() -> Timestamp {
    1_700_000_100
}

fn default_max_iterations() -> usize {
    usize::MAX
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Advance {
        secs: u64,
    },
    Inflow {
        asset: AssetId,
        #[serde(with = "sluice_core::wide_amount")]
        amount: u128,
    },
    Outflow {
        asset: AssetId,
        #[serde(with = "sluice_core::wide_amount")]
        amount: u128,
        recipient: AccountId,
        #[serde(default)]
        payload: String,
    },
    OverrideLimiter {
        asset: AssetId,
        value: bool,
    },
    OverrideRateLimit,
    OverrideExpired,
    Grace {
        /// Grace period length from the current time.
        secs: u64,
    },
    Halt,
    Compact {
        asset: AssetId,
        #[serde(default = "default_max_iterations")]
        max_iterations: usize,
    },
    /// Release a diverted outflow through the asset's settlement strategy.
    Execute {
        asset: AssetId,
        #[serde(with = "sluice_core::wide_amount")]
        amount: u128,
        recipient: AccountId,
        #[serde(default)]
        payload: String,
    },
    Balance {
        asset: AssetId,
        account: AccountId,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::Inflow { .. } => "inflow",
            Self::Outflow { .. } => "outflow",
            Self::OverrideLimiter { .. } => "override_limiter",
            Self::OverrideRateLimit => "override_rate_limit",
            Self::OverrideExpired => "override_expired",
            Self::Grace { .. } => "grace",
            Self::Halt => "halt",
            Self::Compact { .. } => "compact",
            Self::Execute { .. } => "execute",
            Self::Balance { .. } => "balance",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// A breaker wired to a manual clock, in-memory custody and both built-in
/// settlement strategies.
pub struct Simulation {
    pub clock: Arc<ManualClock>,
    pub custody: Arc<InMemoryCustody>,
    pub breaker: CircuitBreaker,
    admin: AccountId,
    vault: AccountId,
}

impl Simulation {
    /// Build a breaker from `config` and register every configured asset.
    pub fn new(config: &BreakerConfig, start: Timestamp) -> anyhow::Result<Self> {
        config.validate()?;

        let clock = Arc::new(ManualClock::new(start));
        let custody = Arc::new(InMemoryCustody::new());

        let mut registry = SettlementRegistry::new();
        registry.register(Arc::new(DelayedSettlement::new(
            AccountId::from("settlement:delayed"),
            config.settlement.delay_secs,
            clock.clone(),
            custody.clone(),
        )));
        registry.register(Arc::new(RejectSettlement::new(
            AccountId::from("settlement:reject"),
            clock.clone(),
        )));

        let admin = AccountId::from(ADMIN);
        let vault = AccountId::from(VAULT);
        let mut breaker = CircuitBreaker::new(
            admin.clone(),
            AccountId::from(BREAKER_CUSTODY),
            config.window,
            clock.clone(),
            custody.clone(),
        )?;
        breaker.add_protected_callers(&admin, &[vault.clone()])?;
        for asset in &config.assets {
            let strategy = registry.get(&asset.settlement)?;
            breaker.register_asset(
                &admin,
                AssetId::new(asset.id.clone()),
                asset.min_retained_bps,
                u128::from(asset.begin_threshold),
                strategy,
            )?;
        }

        Ok(Self {
            clock,
            custody,
            breaker,
            admin,
            vault,
        })
    }

    /// Apply one step, returning a one-line summary.
    pub fn apply(&mut self, step: &Step) -> Result<String, BreakerError> {
        match step {
            Step::Advance { secs } => {
                let now = self.clock.advance(*secs);
                Ok(format!("clock at {now}"))
            }
            Step::Inflow { asset, amount } => {
                self.breaker.record_inflow(&self.vault, asset, *amount)?;
                Ok(format!("recorded inflow of {amount} {asset}"))
            }
            Step::Outflow {
                asset,
                amount,
                recipient,
                payload,
            } => {
                self.custody
                    .deposit(asset, self.breaker.custody_account(), *amount)?;
                let outcome = self.breaker.record_outflow(
                    &self.vault,
                    asset,
                    *amount,
                    recipient,
                    payload.as_bytes(),
                )?;
                Ok(match outcome.effect_id {
                    Some(effect_id) => format!("diverted {amount} {asset} (effect {effect_id})"),
                    None => format!("delivered {amount} {asset} to {recipient}"),
                })
            }
            Step::OverrideLimiter { asset, value } => {
                let previous = self
                    .breaker
                    .override_limiter_flag(&self.admin, asset, *value)?;
                Ok(format!("limiter override for {asset}: {previous} -> {value}"))
            }
            Step::OverrideRateLimit => {
                self.breaker.override_rate_limit(&self.admin)?;
                Ok("rate limit cleared by admin".into())
            }
            Step::OverrideExpired => {
                self.breaker.override_expired_rate_limit()?;
                Ok("rate limit cleared after cooldown".into())
            }
            Step::Grace { secs } => {
                let end = self.clock.now().saturating_add(*secs);
                self.breaker.start_grace_period(&self.admin, end)?;
                Ok(format!("grace period until {end}"))
            }
            Step::Halt => {
                self.breaker.set_operational_status(&self.admin, false)?;
                Ok("breaker halted".into())
            }
            Step::Compact {
                asset,
                max_iterations,
            } => {
                let evicted = self.breaker.compact_backlog(asset, *max_iterations)?;
                Ok(format!("evicted {evicted} node(s) from {asset}"))
            }
            Step::Execute {
                asset,
                amount,
                recipient,
                payload,
            } => {
                let strategy = self
                    .breaker
                    .ledger(asset)
                    .and_then(|l| l.settlement())
                    .cloned()
                    .ok_or_else(|| BreakerError::AssetNotRegistered(asset.clone()))?;
                let target = SettlementTarget::new(asset.clone(), recipient.clone());
                strategy.execute(&target, *amount, payload.as_bytes())?;
                Ok(format!("released {amount} {asset} to {recipient}"))
            }
            Step::Balance { asset, account } => {
                let balance = self.custody.balance_of(asset, account);
                Ok(format!("{account} holds {balance} {asset}"))
            }
        }
    }

    /// Final breaker state and one ledger snapshot per asset.
    pub fn report(&self) -> serde_json::Value {
        let mut assets = serde_json::Map::new();
        for asset in self.breaker.assets() {
            if let Some(snapshot) = self.breaker.ledger_snapshot(asset) {
                assets.insert(
                    asset.to_string(),
                    serde_json::to_value(snapshot).unwrap_or_default(),
                );
            }
        }
        serde_json::json!({
            "now": self.clock.now(),
            "policy": self.breaker.policy_id(),
            "state": self.breaker.state(),
            "assets": assets,
        })
    }
}
