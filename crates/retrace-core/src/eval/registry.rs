//! Strategy registry

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::eval::strategies::{DagStrategy, EvalStrategy, QagStrategy, StringMatchStrategy};

/// Named evaluation strategies. Each evaluator owns its own registry;
/// there is no process-wide table to race on.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn EvalStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in strategies
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(StringMatchStrategy));
        registry.register(Arc::new(QagStrategy));
        registry.register(Arc::new(DagStrategy));
        registry
    }

    /// Register a strategy under its own name, replacing any previous one
    pub fn register(&mut self, strategy: Arc<dyn EvalStrategy>) {
        debug!(name = strategy.name(), "registered eval strategy");
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EvalStrategy>> {
        self.strategies.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered strategy names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
