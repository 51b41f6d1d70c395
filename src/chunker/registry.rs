use super::{
    ChunkingStrategy, CustomStrategy, DocumentLevelStrategy, ElementLevelStrategy,
    HierarchicalStrategy, DOCUMENT_LEVEL, ELEMENT_LEVEL, HIERARCHICAL,
};
use crate::config::StrategyConfig;
use crate::error::ChunkerError;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a strategy from its configuration
pub type StrategyFactory =
    Box<dyn Fn(&StrategyConfig) -> Result<Arc<dyn ChunkingStrategy>, ChunkerError> + Send + Sync>;

/// Name -> strategy lookup, scoped to one engine
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    /// Create a registry holding the three built-in strategies
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_factory(ELEMENT_LEVEL, |config| {
            Ok(Arc::new(ElementLevelStrategy::new(config.clone())))
        });
        registry.register_factory(HIERARCHICAL, |config| {
            Ok(Arc::new(HierarchicalStrategy::new(config.clone())))
        });
        registry.register_factory(DOCUMENT_LEVEL, |config| {
            Ok(Arc::new(DocumentLevelStrategy::new(config.clone())))
        });
        registry
    }

    /// Create a registry with no strategies at all
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under `name`, replacing any previous one
    ///
    /// # Example
    /// ```ignore
    /// registry.register_factory("hierarchical", |config| {
    ///     Ok(Arc::new(MyHierarchical::new(config.clone())))
    /// });
    /// ```
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&StrategyConfig) -> Result<Arc<dyn ChunkingStrategy>, ChunkerError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Register an already-built strategy; its own config wins over the caller's
    pub fn register(&mut self, name: impl Into<String>, strategy: impl ChunkingStrategy + 'static) {
        let strategy: Arc<dyn ChunkingStrategy> = Arc::new(strategy);
        self.register_factory(name, move |_| Ok(Arc::clone(&strategy)));
    }

    /// Construct the strategy registered under `name`
    ///
    /// Unregistered names fall back to a rule-driven strategy when the
    /// configuration declares rules.
    pub fn create(
        &self,
        name: &str,
        config: &StrategyConfig,
    ) -> Result<Arc<dyn ChunkingStrategy>, ChunkerError> {
        let mut config = config.clone();
        config.name = name.to_string();

        if let Some(factory) = self.factories.get(name) {
            return factory(&config);
        }
        if !config.rules.is_empty() {
            return Ok(Arc::new(CustomStrategy::from_config(&config)?));
        }

        Err(
            ChunkerError::config_invalid(format!("unknown chunking strategy '{}'", name))
                .with_context("strategy", name),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Get the number of registered strategies
    pub fn strategy_count(&self) -> usize {
        self.factories.len()
    }

    /// List all registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{Action, Condition, Rule};
    use crate::parser::NodeKind;

    #[test]
    fn test_builtins_registered() {
        let registry = StrategyRegistry::new();
        assert_eq!(registry.strategy_count(), 3);
        assert_eq!(
            registry.names(),
            vec![DOCUMENT_LEVEL, ELEMENT_LEVEL, HIERARCHICAL]
        );
    }

    #[test]
    fn test_create_sets_name() {
        let registry = StrategyRegistry::new();
        let strategy = registry
            .create(HIERARCHICAL, &StrategyConfig::default())
            .unwrap();
        assert_eq!(strategy.name(), HIERARCHICAL);
        assert_eq!(strategy.config().name, HIERARCHICAL);
    }

    #[test]
    fn test_unknown_strategy_is_config_invalid() {
        let registry = StrategyRegistry::new();
        let err = registry
            .create("nope", &StrategyConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.kind, crate::error::ErrorKind::ConfigInvalid);
        assert_eq!(err.context["strategy"], "nope");
    }

    #[test]
    fn test_unknown_name_with_rules_builds_custom() {
        let registry = StrategyRegistry::new();
        let mut config = StrategyConfig::named("code-first");
        config.rules.push(Rule::new(
            "code",
            Condition::content_type([NodeKind::Code]),
            Action::separate_chunk("snippet"),
        ));

        let strategy = registry.create("code-first", &config).unwrap();
        assert_eq!(strategy.name(), "code-first");
        assert_eq!(strategy.config().rules.len(), 1);
    }

    #[test]
    fn test_register_overrides_builtin() {
        let mut registry = StrategyRegistry::new();
        registry.register(
            HIERARCHICAL,
            DocumentLevelStrategy::new(StrategyConfig::named("replacement")),
        );

        assert_eq!(registry.strategy_count(), 3);
        let strategy = registry
            .create(HIERARCHICAL, &StrategyConfig::default())
            .unwrap();
        assert_eq!(strategy.name(), "replacement");
    }
}
