//! Sluice Core
//!
//! Domain types, the per-asset sliding-window liquidity ledger, the
//! retained-liquidity rate-limit policy, the global breaker state and the
//! clock port shared by every other Sluice crate.

pub mod error;
pub mod types;
pub mod ledger;
pub mod policy;
pub mod state_machine;
pub mod clock;
pub mod config;
pub mod wide_amount;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AssetConfig, BreakerConfig, LoggingConfig, SettlementConfig, WindowConfig};
pub use error::CoreError;
pub use ledger::{LedgerParams, LedgerSnapshot, LiquidityLedger};
pub use policy::{LimitStatus, NetOutflowCap, PolicyInput, RateLimitPolicy, RetainedLiquidityFloor};
pub use state_machine::{BreakerState, Latch, LatchEvent, LatchMachine};
pub use types::{to_signed, AccountId, AssetId, LedgerNode, SignedAmount, Tick, Timestamp, BPS_DENOMINATOR};
