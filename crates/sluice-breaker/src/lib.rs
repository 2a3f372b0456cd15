//! Sluice Circuit Breaker
//!
//! Ties the per-asset liquidity ledgers to the global breaker state and the
//! settlement strategies: records inflows and outflows, diverts outflows
//! that breach their asset's floor, and exposes the admin and permissionless
//! override controls.

pub mod error;
pub mod events;
pub mod breaker;

pub use breaker::{CircuitBreaker, OutflowOutcome};
pub use error::BreakerError;
pub use events::BreakerEvent;
