use dashmap::DashMap;
use sluice_core::{AccountId, Clock};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SettlementError;
use crate::traits::SettlementStrategy;
use crate::types::{content_digest, EffectId, EffectStatus, SettlementEffect, SettlementTarget};

/// Fail-closed settlement.
///
/// Every diverted outflow is recorded as permanently blocked; `execute`
/// never succeeds and funds stay in strategy custody until recovered out of
/// band.
pub struct RejectSettlement {
    custody: AccountId,
    clock: Arc<dyn Clock>,
    effects: DashMap<EffectId, SettlementEffect>,
}

impl RejectSettlement {
    pub fn new(custody: AccountId, clock: Arc<dyn Clock>) -> Self {
        Self {
            custody,
            clock,
            effects: DashMap::new(),
        }
    }

    /// Get a blocked effect by its id.
    pub fn get(&self, effect_id: &EffectId) -> Option<SettlementEffect> {
        self.effects.get(effect_id).map(|entry| entry.clone())
    }

    /// Blocked effects matching `(target, value, payload)`.
    pub fn find(&self, target: &SettlementTarget, value: u128, payload: &[u8]) -> Vec<EffectId> {
        self.effects
            .iter()
            .filter(|entry| entry.matches(target, value, payload))
            .map(|entry| entry.id)
            .collect()
    }

    /// Total value held across all blocked effects.
    pub fn blocked_value(&self) -> u128 {
        self.effects.iter().map(|entry| entry.value).sum()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl SettlementStrategy for RejectSettlement {
    fn prevent(
        &self,
        target: &SettlementTarget,
        value: u128,
        payload: &[u8],
    ) -> Result<EffectId, SettlementError> {
        let id = EffectId::derive(target, value, payload, &Uuid::now_v7());
        self.effects.insert(
            id,
            SettlementEffect {
                id,
                target: target.clone(),
                value,
                payload: payload.to_vec(),
                status: EffectStatus::Blocked,
                created_at: self.clock.now(),
                ready_at: None,
                digest: content_digest(target, value, payload),
            },
        );
        tracing::warn!(effect_id = %id, %target, value, "outflow blocked permanently");
        Ok(id)
    }

    fn execute(
        &self,
        target: &SettlementTarget,
        value: u128,
        _payload: &[u8],
    ) -> Result<(), SettlementError> {
        tracing::debug!(%target, value, "execute refused by reject settlement");
        Err(SettlementError::Unexecutable)
    }

    fn custody_account(&self) -> &AccountId {
        &self.custody
    }

    fn strategy_id(&self) -> &str {
        "reject"
    }
}
