use super::{
    Action, ChunkAssembler, ChunkingStrategy, Condition, ElementLevelStrategy, Traversal,
    DEFAULT_SEPARATOR,
};
use crate::config::StrategyConfig;
use crate::error::ChunkerError;
use crate::parser::{Document, Node, NodeKind};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::debug;

/// A (condition, action, priority) triple; higher priority is tried first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub condition: Condition,
    pub action: Action,
    #[serde(default)]
    pub priority: i32,
}

impl Rule {
    pub fn new(name: impl Into<String>, condition: Condition, action: Action) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            condition,
            action,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Rule-driven strategy: the first matching rule decides each node
pub struct CustomStrategy {
    config: StrategyConfig,
}

impl CustomStrategy {
    pub fn builder(name: impl Into<String>) -> CustomStrategyBuilder {
        CustomStrategyBuilder::new(name)
    }

    /// Build from a declarative configuration carrying `rules`
    pub fn from_config(config: &StrategyConfig) -> Result<Self, ChunkerError> {
        CustomStrategyBuilder {
            config: config.clone(),
        }
        .build()
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.config.rules
    }

    /// First rule whose condition matches `node`
    pub fn select(&self, node: &Node, has_open_chunk: bool) -> Option<&Rule> {
        self.config
            .rules
            .iter()
            .find(|rule| rule.condition.matches(node, has_open_chunk))
    }

    fn visit(&self, node: &Node, assembler: &mut ChunkAssembler<'_>) -> Result<(), ChunkerError> {
        let traversal = if !assembler.accepts(node.kind) {
            Traversal::Descend
        } else {
            match self.select(node, assembler.has_open_chunk()) {
                Some(rule) => {
                    debug!(rule = %rule.name, kind = %node.kind, "rule matched");
                    rule.action.apply(node, assembler)?
                }
                None => {
                    assembler.merge_into_open(node, DEFAULT_SEPARATOR)?;
                    Traversal::Descend
                }
            }
        };

        if traversal == Traversal::Descend {
            for child in &node.children {
                self.visit(child, assembler)?;
            }
        }
        Ok(())
    }
}

impl ChunkingStrategy for CustomStrategy {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn chunk(
        &self,
        document: &Document,
        assembler: &mut ChunkAssembler<'_>,
    ) -> Result<(), ChunkerError> {
        if self.config.rules.is_empty() {
            return ElementLevelStrategy::new(self.config.clone()).chunk(document, assembler);
        }

        for node in &document.nodes {
            self.visit(node, assembler)?;
        }
        assembler.finish()
    }
}

/// Collects rules and settings; rules are frozen by [`build`](Self::build)
pub struct CustomStrategyBuilder {
    config: StrategyConfig,
}

impl CustomStrategyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: StrategyConfig::named(name),
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.config.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.config.rules.extend(rules);
        self
    }

    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.config.max_chunk_size = Some(size);
        self
    }

    pub fn min_chunk_size(mut self, size: usize) -> Self {
        self.config.min_chunk_size = Some(size);
        self
    }

    pub fn merge_empty(mut self, merge: bool) -> Self {
        self.config.merge_empty = Some(merge);
        self
    }

    pub fn include_types(mut self, kinds: impl IntoIterator<Item = NodeKind>) -> Self {
        self.config.include_types = kinds.into_iter().collect();
        self
    }

    /// Validate the rule set and sort it by descending priority
    ///
    /// The sort is stable, so the first-registered rule wins a tie.
    pub fn build(mut self) -> Result<CustomStrategy, ChunkerError> {
        let mut seen = HashSet::new();
        for rule in &self.config.rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(ChunkerError::config_invalid(format!(
                    "duplicate rule name '{}' in strategy '{}'",
                    rule.name, self.config.name
                ))
                .with_context("rule", rule.name.as_str()));
            }
            rule.condition.validate().map_err(|reason| {
                ChunkerError::config_invalid(format!("rule '{}': {}", rule.name, reason))
                    .with_context("rule", rule.name.as_str())
            })?;
        }

        self.config.rules.sort_by_key(|rule| Reverse(rule.priority));
        Ok(CustomStrategy {
            config: self.config,
        })
    }
}
