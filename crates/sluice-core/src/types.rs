use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Seconds since the UNIX epoch.
pub type Timestamp = u64;

/// Net signed liquidity delta (positive = inflow, negative = outflow).
pub type SignedAmount = i128;

/// Denominator for basis-point thresholds (100% = 10_000 bps).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Identifier of a tracked asset (token symbol, contract address, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Create a new asset identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a party: an admin, a protected caller, a recipient or a
/// custody account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A timestamp rounded down to a multiple of the tick length.
///
/// Deltas recorded within the same tick share one ledger node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    /// Bucket `timestamp` into its tick: `t - (t mod tick_length)`.
    ///
    /// A zero tick length disables bucketing.
    pub fn from_timestamp(timestamp: Timestamp, tick_length: u64) -> Self {
        if tick_length == 0 {
            return Self(timestamp);
        }
        Self(timestamp - timestamp % tick_length)
    }

    /// Wrap an already-aligned tick value (e.g. for lookups).
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The tick's start, in seconds since the epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed between the start of this tick and `now`.
    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.0)
    }

    /// Whether this tick is a multiple of `tick_length`.
    pub fn is_aligned(&self, tick_length: u64) -> bool {
        tick_length == 0 || self.0 % tick_length == 0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the ledger's tick-ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerNode {
    /// The next (newer) tick in the window, if any.
    pub next_tick: Option<Tick>,
    /// Net signed delta accumulated within this tick.
    pub amount: SignedAmount,
}

/// Convert an unsigned transfer amount into the ledger's signed domain.
pub fn to_signed(amount: u128) -> Result<SignedAmount, CoreError> {
    SignedAmount::try_from(amount).map_err(|_| CoreError::AmountOverflow)
}
