use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SettlementError;
use crate::traits::SettlementStrategy;

/// Registry of settlement strategies, keyed by `strategy_id()`.
///
/// Lets configuration refer to strategies by name; the breaker itself holds
/// the resolved `Arc` per asset.
pub struct SettlementRegistry {
    strategies: HashMap<String, Arc<dyn SettlementStrategy>>,
}

impl SettlementRegistry {
    /// Create a registry with no strategies registered.
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register a strategy, replacing any previous one with the same id.
    pub fn register(&mut self, strategy: Arc<dyn SettlementStrategy>) {
        let id = strategy.strategy_id().to_string();
        tracing::info!(strategy_id = %id, "Registering settlement strategy");
        self.strategies.insert(id, strategy);
    }

    /// Unregister a strategy by its id.
    pub fn unregister(&mut self, strategy_id: &str) -> Option<Arc<dyn SettlementStrategy>> {
        self.strategies.remove(strategy_id)
    }

    /// Resolve a strategy by its id.
    pub fn get(&self, strategy_id: &str) -> Result<Arc<dyn SettlementStrategy>, SettlementError> {
        self.strategies
            .get(strategy_id)
            .cloned()
            .ok_or_else(|| SettlementError::StrategyNotFound(strategy_id.to_string()))
    }

    /// List all registered strategy ids.
    pub fn strategy_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.strategies.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for SettlementRegistry {
    fn default() -> Self {
        Self::new()
    }
}
