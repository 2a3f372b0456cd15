use dashmap::DashMap;
use sluice_core::{AccountId, AssetId};
use uuid::Uuid;

use crate::error::SettlementError;
use crate::traits::AssetMover;

/// An individual entry in the double-entry journal.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    /// The account whose balance is affected.
    pub account: AccountId,
    /// Asset of the entry.
    pub asset: AssetId,
    /// Positive = credit, negative = debit.
    pub delta: i128,
    /// Shared by the debit and credit legs of one transfer.
    pub transfer_id: Uuid,
}

/// In-memory double-entry custody book.
///
/// Implements [`AssetMover`] for tests, simulations and single-process
/// deployments. Accounts can be marked as refusing incoming transfers to
/// model recipients that reject funds.
pub struct InMemoryCustody {
    /// Journal entries keyed by entry id.
    journal: DashMap<Uuid, JournalEntry>,
    /// Balance tracker: "account:asset" -> signed balance.
    balances: DashMap<String, i128>,
    /// Accounts that refuse incoming transfers, with the reason reported.
    rejecting: DashMap<AccountId, String>,
}

impl InMemoryCustody {
    /// Create an empty custody book.
    pub fn new() -> Self {
        Self {
            journal: DashMap::new(),
            balances: DashMap::new(),
            rejecting: DashMap::new(),
        }
    }

    fn balance_key(account: &AccountId, asset: &AssetId) -> String {
        format!("{}:{}", account, asset)
    }

    /// Credit `account` with newly custodied funds (no counterparty leg).
    pub fn deposit(
        &self,
        asset: &AssetId,
        account: &AccountId,
        value: u128,
    ) -> Result<(), SettlementError> {
        let credit = self.checked_credit(asset, account, value)?;
        self.post(Uuid::now_v7(), account, asset, credit);
        tracing::debug!(%asset, %account, value, "custody deposit");
        Ok(())
    }

    /// Make `account` refuse every incoming transfer.
    pub fn reject_transfers_to(&self, account: AccountId, reason: impl Into<String>) {
        self.rejecting.insert(account, reason.into());
    }

    /// Lift a previous [`reject_transfers_to`](Self::reject_transfers_to).
    pub fn accept_transfers_to(&self, account: &AccountId) {
        self.rejecting.remove(account);
    }

    /// Number of journal entries recorded so far.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// All journal entries touching `account`.
    pub fn entries_for(&self, account: &AccountId) -> Vec<JournalEntry> {
        self.journal
            .iter()
            .filter(|entry| &entry.account == account)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Signed form of `value`, provided crediting it to `account` cannot overflow.
    fn checked_credit(
        &self,
        asset: &AssetId,
        account: &AccountId,
        value: u128,
    ) -> Result<i128, SettlementError> {
        i128::try_from(value)
            .ok()
            .filter(|v| self.balance_of(asset, account).checked_add(*v).is_some())
            .ok_or_else(|| SettlementError::BalanceOverflow {
                account: account.clone(),
                value,
            })
    }

    /// Callers check the resulting balance first.
    fn post(&self, transfer_id: Uuid, account: &AccountId, asset: &AssetId, delta: i128) {
        self.journal.insert(
            Uuid::now_v7(),
            JournalEntry {
                account: account.clone(),
                asset: asset.clone(),
                delta,
                transfer_id,
            },
        );
        self.balances
            .entry(Self::balance_key(account, asset))
            .and_modify(|b| *b = b.saturating_add(delta))
            .or_insert(delta);
    }
}

impl Default for InMemoryCustody {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetMover for InMemoryCustody {
    fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        value: u128,
    ) -> Result<(), SettlementError> {
        if let Some(reason) = self.rejecting.get(to) {
            return Err(SettlementError::TransferRejected {
                account: to.clone(),
                reason: reason.value().clone(),
            });
        }
        let available = self.balance_of(asset, from);
        let signed = i128::try_from(value)
            .ok()
            .filter(|v| *v <= available)
            .ok_or(SettlementError::InsufficientBalance {
                available,
                required: value,
            })?;

        if from != to {
            self.checked_credit(asset, to, value)?;
        }

        let transfer_id = Uuid::now_v7();
        self.post(transfer_id, from, asset, -signed);
        self.post(transfer_id, to, asset, signed);
        tracing::debug!(%asset, %from, %to, value, "custody transfer");
        Ok(())
    }

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> i128 {
        self.balances
            .get(&Self::balance_key(account, asset))
            .map(|b| *b)
            .unwrap_or(0)
    }
}
