//! Sluice Settlement Layer
//!
//! Pluggable strategies that take custody of outflows diverted by the
//! breaker, plus the asset-mover abstraction used to move value between
//! accounts.

pub mod error;
pub mod types;
pub mod traits;
pub mod custody;
pub mod delayed;
pub mod reject;
pub mod registry;

pub use custody::InMemoryCustody;
pub use delayed::DelayedSettlement;
pub use error::SettlementError;
pub use registry::SettlementRegistry;
pub use reject::RejectSettlement;
pub use traits::{AssetMover, SettlementStrategy};
pub use types::{EffectId, EffectStatus, SettlementEffect, SettlementTarget};
