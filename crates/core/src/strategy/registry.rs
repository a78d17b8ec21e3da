//! Install strategy registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::InstallStrategy;
use crate::config::InstallMethod;

/// Registry of install strategies, one per [`InstallMethod`].
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<InstallMethod, Arc<dyn InstallStrategy>>,
}

impl StrategyRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under the method it reports.
    ///
    /// If a strategy for the same method already exists, it will be replaced.
    pub fn register<S: InstallStrategy + 'static>(&mut self, strategy: S) {
        self.register_arc(Arc::new(strategy));
    }

    /// Register a strategy wrapped in Arc.
    pub fn register_arc(&mut self, strategy: Arc<dyn InstallStrategy>) {
        self.strategies.insert(strategy.method(), strategy);
    }

    /// Get the strategy for a method.
    #[must_use]
    pub fn get(&self, method: InstallMethod) -> Option<&Arc<dyn InstallStrategy>> {
        self.strategies.get(&method)
    }

    /// Iterate over all registered strategies, in method order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn InstallStrategy>> {
        self.strategies.values()
    }

    /// Get the number of registered strategies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Methods that have a strategy.
    #[must_use]
    pub fn methods(&self) -> Vec<InstallMethod> {
        self.strategies.keys().copied().collect()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}
