use crate::types::Timestamp;

/// Core protocol errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("invalid retained-liquidity threshold: {0} bps (must be in 1..=10000)")]
    InvalidThreshold(u32),

    #[error("ledger already initialized")]
    AlreadyInitialized,

    #[error("ledger not initialized")]
    NotInitialized,

    #[error("amount does not fit the signed ledger range")]
    AmountOverflow,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("system is not rate limited")]
    NotRateLimited,

    #[error("cooldown not elapsed: latch can be cleared at {ready_at}, now {now}")]
    CooldownNotElapsed { ready_at: Timestamp, now: Timestamp },

    #[error("grace period end {end} is not after now ({now})")]
    InvalidGracePeriodEnd { end: Timestamp, now: Timestamp },

    #[error("breaker is halted; operational status cannot be restored")]
    HaltIsFinal,
}
