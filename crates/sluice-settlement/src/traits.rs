use sluice_core::{AccountId, AssetId};

use crate::error::SettlementError;
use crate::types::{EffectId, SettlementTarget};

/// Settlement strategy interface.
///
/// Invoked by the breaker when an outflow trips its asset's limit. The
/// breaker moves the diverted value into [`custody_account`] before calling
/// [`prevent`]; what happens afterwards is up to the strategy.
///
/// [`custody_account`]: SettlementStrategy::custody_account
/// [`prevent`]: SettlementStrategy::prevent
pub trait SettlementStrategy: Send + Sync {
    /// Accept custody of a diverted outflow and register its effect.
    fn prevent(
        &self,
        target: &SettlementTarget,
        value: u128,
        payload: &[u8],
    ) -> Result<EffectId, SettlementError>;

    /// Attempt to release a previously registered effect.
    fn execute(
        &self,
        target: &SettlementTarget,
        value: u128,
        payload: &[u8],
    ) -> Result<(), SettlementError>;

    /// Account that holds diverted funds on behalf of this strategy.
    fn custody_account(&self) -> &AccountId;

    /// Return the unique identifier of this strategy (e.g. "delayed").
    fn strategy_id(&self) -> &str;
}

/// Moves value between accounts.
///
/// Implementations must either complete the transfer or return an error;
/// a transfer is never dropped silently.
pub trait AssetMover: Send + Sync {
    /// Move `value` units of `asset` from `from` to `to`.
    fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        value: u128,
    ) -> Result<(), SettlementError>;

    /// Current balance of `account` in `asset`.
    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> i128;
}
