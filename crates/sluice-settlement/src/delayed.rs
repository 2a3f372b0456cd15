use dashmap::DashMap;
use sluice_core::{AccountId, Clock};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::SettlementError;
use crate::traits::{AssetMover, SettlementStrategy};
use crate::types::{content_digest, EffectId, EffectStatus, SettlementEffect, SettlementTarget};

/// Delay-then-release settlement.
///
/// `prevent` queues the diverted outflow; `execute` releases it to the
/// original recipient once `min_delay` has elapsed. Until then a supervisor
/// may [`cancel`](Self::cancel) it, leaving the funds in strategy custody.
///
/// Thread-safe: uses `DashMap` for concurrent access.
pub struct DelayedSettlement {
    custody: AccountId,
    min_delay: u64,
    clock: Arc<dyn Clock>,
    mover: Arc<dyn AssetMover>,
    effects: DashMap<EffectId, SettlementEffect>,
}

impl DelayedSettlement {
    pub fn new(
        custody: AccountId,
        min_delay: u64,
        clock: Arc<dyn Clock>,
        mover: Arc<dyn AssetMover>,
    ) -> Self {
        Self {
            custody,
            min_delay,
            clock,
            mover,
            effects: DashMap::new(),
        }
    }

    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    /// Veto a scheduled effect.
    pub fn cancel(&self, effect_id: &EffectId) -> Result<SettlementEffect, SettlementError> {
        let mut entry = self
            .effects
            .get_mut(effect_id)
            .ok_or(SettlementError::EffectNotFound(*effect_id))?;
        let effect = entry.value_mut();

        if effect.status != EffectStatus::Scheduled {
            return Err(SettlementError::InvalidStateTransition(format!(
                "cannot cancel effect in status {}",
                effect.status
            )));
        }

        effect.status = EffectStatus::Cancelled;
        tracing::info!(effect_id = %effect_id, target = %effect.target, "delayed settlement cancelled");
        Ok(effect.clone())
    }

    /// Get an effect by its id.
    pub fn get(&self, effect_id: &EffectId) -> Option<SettlementEffect> {
        self.effects.get(effect_id).map(|entry| entry.clone())
    }

    /// Effects still waiting to be released, oldest first.
    pub fn pending(&self) -> Vec<SettlementEffect> {
        let mut pending: Vec<SettlementEffect> = self
            .effects
            .iter()
            .filter(|entry| entry.status == EffectStatus::Scheduled)
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by_key(|effect| effect.created_at);
        pending
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl SettlementStrategy for DelayedSettlement {
    fn prevent(
        &self,
        target: &SettlementTarget,
        value: u128,
        payload: &[u8],
    ) -> Result<EffectId, SettlementError> {
        let now = self.clock.now();
        let id = EffectId::derive(target, value, payload, &Uuid::now_v7());
        let ready_at = now.saturating_add(self.min_delay);
        self.effects.insert(
            id,
            SettlementEffect {
                id,
                target: target.clone(),
                value,
                payload: payload.to_vec(),
                status: EffectStatus::Scheduled,
                created_at: now,
                ready_at: Some(ready_at),
                digest: content_digest(target, value, payload),
            },
        );
        tracing::info!(effect_id = %id, %target, value, ready_at, "delayed settlement scheduled");
        Ok(id)
    }

    /// Releases the oldest matching scheduled effect.
    fn execute(
        &self,
        target: &SettlementTarget,
        value: u128,
        payload: &[u8],
    ) -> Result<(), SettlementError> {
        let now = self.clock.now();
        let digest = content_digest(target, value, payload);

        let mut cancelled = None;
        let mut candidate: Option<(EffectId, u64)> = None;
        for entry in self.effects.iter() {
            let effect = entry.value();
            if effect.digest != digest {
                continue;
            }
            match effect.status {
                EffectStatus::Scheduled => {
                    let ready_at = effect.ready_at.unwrap_or(u64::MAX);
                    if candidate.map_or(true, |(_, best)| ready_at < best) {
                        candidate = Some((effect.id, ready_at));
                    }
                }
                EffectStatus::Cancelled => cancelled = Some(effect.id),
                EffectStatus::Executed | EffectStatus::Blocked => {}
            }
        }

        let Some((id, ready_at)) = candidate else {
            return Err(match cancelled {
                Some(id) => SettlementError::Cancelled(id),
                None => SettlementError::NoMatchingEffect(target.clone()),
            });
        };
        if now < ready_at {
            return Err(SettlementError::TooEarly { ready_at, now });
        }

        let mut entry = self
            .effects
            .get_mut(&id)
            .ok_or(SettlementError::EffectNotFound(id))?;
        let effect = entry.value_mut();
        if effect.status != EffectStatus::Scheduled {
            return Err(SettlementError::InvalidStateTransition(format!(
                "cannot execute effect in status {}",
                effect.status
            )));
        }

        self.mover
            .transfer(&target.asset, &self.custody, &target.recipient, value)?;
        effect.status = EffectStatus::Executed;
        tracing::info!(effect_id = %id, %target, value, "delayed settlement executed");
        Ok(())
    }

    fn custody_account(&self) -> &AccountId {
        &self.custody
    }

    fn strategy_id(&self) -> &str {
        "delayed"
    }
}
