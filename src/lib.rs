// Public API exports
pub mod chunker;
pub mod config;
pub mod error;
pub mod extractors;
pub mod parser;
pub mod stats;

// Re-export main types for convenience
pub use chunker::{
    Action, Chunk, ChunkId, ChunkOutput, ChunkingEngine, ChunkingStrategy, Condition,
    CustomStrategy, CustomStrategyBuilder, Rule, StrategyRegistry, DOCUMENT_LEVEL, ELEMENT_LEVEL,
    HIERARCHICAL,
};

pub use config::{migrate, ChunkerConfig, ErrorHandling, Migration, StrategyConfig};

pub use error::{ChunkerError, ErrorKind, ErrorLog};

pub use extractors::{
    default_extractors, CodeBlockExtractor, ImageExtractor, LinkExtractor, MetadataExtractor,
};

pub use parser::{Document, MarkdownParser, Node, NodeKind, Parser};

pub use stats::PerformanceStats;
