use sluice_core::{AccountId, AssetId, CoreError};
use sluice_settlement::SettlementError;

/// Circuit breaker errors.
///
/// A rate-limit trigger is not an error; see
/// [`OutflowOutcome`](crate::OutflowOutcome).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreakerError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("breaker is not operational")]
    NotOperational,

    #[error("caller is not the admin")]
    NotAdmin,

    #[error("caller is not a protected caller")]
    NotProtectedCaller,

    #[error("asset not registered: {0}")]
    AssetNotRegistered(AssetId),

    /// Settlement refused a diverted outflow and returning the funds to
    /// breaker custody failed too. The breaker rolled back its own state;
    /// `amount` sits in `stranded_in` until recovered out of band.
    #[error("settlement failed ({cause}) and returning {amount} from {stranded_in} failed ({undo})")]
    CompensationFailed {
        cause: SettlementError,
        undo: SettlementError,
        stranded_in: AccountId,
        amount: u128,
    },
}
