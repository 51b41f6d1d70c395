mod action;
mod assembler;
mod condition;
mod custom;
mod engine;
mod hierarchical;
mod registry;
mod strategy;
mod types;


pub use action::{Action, Traversal};
pub use assembler::{Assembly, AssemblySettings, ChunkAssembler};
pub use condition::Condition;
pub use custom::{CustomStrategy, CustomStrategyBuilder, Rule};
pub use engine::{ChunkOutput, ChunkingEngine};
pub use hierarchical::HierarchicalStrategy;
pub use registry::{StrategyFactory, StrategyRegistry};
pub use strategy::{
    ChunkingStrategy, DocumentLevelStrategy, ElementLevelStrategy, BUILTIN_STRATEGIES,
    DOCUMENT_LEVEL, ELEMENT_LEVEL, HIERARCHICAL,
};
pub use types::{content_hash, Chunk, ChunkBuilder, ImageRef, LinkRef};

/// Unique identifier for a chunk
pub type ChunkId = u32;

/// Join delimiter used when nodes are merged without an explicit separator
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Hex characters of the content digest kept in `Chunk::hash`
pub const HASH_PREFIX_LEN: usize = 16;
