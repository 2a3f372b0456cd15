use sluice_core::{AccountId, Timestamp};

use crate::types::{EffectId, SettlementTarget};

/// Settlement-layer errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("effect not found: {0}")]
    EffectNotFound(EffectId),

    #[error("no registered effect matches {0}")]
    NoMatchingEffect(SettlementTarget),

    #[error("effect not executable yet: ready at {ready_at}, now {now}")]
    TooEarly { ready_at: Timestamp, now: Timestamp },

    #[error("effect is permanently unexecutable")]
    Unexecutable,

    #[error("effect was cancelled: {0}")]
    Cancelled(EffectId),

    #[error("invalid effect state transition: {0}")]
    InvalidStateTransition(String),

    #[error("transfer to {account} rejected: {reason}")]
    TransferRejected { account: AccountId, reason: String },

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i128, required: u128 },

    #[error("crediting {value} to {account} would overflow its balance")]
    BalanceOverflow { account: AccountId, value: u128 },

    #[error("settlement strategy not registered: {0}")]
    StrategyNotFound(String),
}
