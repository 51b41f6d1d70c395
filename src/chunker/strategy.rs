use super::{ChunkAssembler, ChunkBuilder};
use crate::config::StrategyConfig;
use crate::error::ChunkerError;
use crate::parser::Document;
use std::collections::BTreeMap;
use tracing::debug;

pub const ELEMENT_LEVEL: &str = "element-level";
pub const HIERARCHICAL: &str = "hierarchical";
pub const DOCUMENT_LEVEL: &str = "document-level";

/// Names that always resolve to a built-in strategy unless overridden
pub const BUILTIN_STRATEGIES: [&str; 3] = [ELEMENT_LEVEL, HIERARCHICAL, DOCUMENT_LEVEL];

/// Core trait that all chunking strategies must implement
///
/// Strategies are immutable once built; every piece of per-run state lives
/// in the assembler, so one strategy can serve any number of runs.
pub trait ChunkingStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Configuration the strategy was built from
    fn config(&self) -> &StrategyConfig;

    /// Walk `document` and drive `assembler` to produce chunks
    fn chunk(
        &self,
        document: &Document,
        assembler: &mut ChunkAssembler<'_>,
    ) -> Result<(), ChunkerError>;
}

/// One chunk per eligible top-level node
pub struct ElementLevelStrategy {
    config: StrategyConfig,
}

impl ElementLevelStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }
}

impl ChunkingStrategy for ElementLevelStrategy {
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
        let no_metadata = BTreeMap::new();
        for node in &document.nodes {
            if !assembler.accepts(node.kind) {
                debug!(kind = %node.kind, "skipped node");
                continue;
            }
            assembler.open_chunk(node, node.kind.as_str(), &no_metadata, true)?;
        }
        assembler.finish()
    }
}

/// The whole document as a single chunk
pub struct DocumentLevelStrategy {
    config: StrategyConfig,
}

impl DocumentLevelStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }
}

impl ChunkingStrategy for DocumentLevelStrategy {
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
        let mut builder = ChunkBuilder::new("document", 0, document.full_position());
        builder.content = document.source.clone();
        builder.text = document
            .nodes
            .iter()
            .map(|n| n.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        for node in &document.nodes {
            assembler.inspect(&mut builder, node, true);
        }
        assembler.finalize(builder)
    }
}
