use super::{AssemblySettings, Chunk, ChunkAssembler, ChunkingStrategy, StrategyRegistry};
use crate::config::{ChunkerConfig, ErrorHandling, StrategyConfig};
use crate::error::{ChunkerError, ErrorKind, ErrorLog};
use crate::extractors::{default_extractors, MetadataExtractor};
use crate::parser::{Document, MarkdownParser, Parser};
use crate::stats::PerformanceStats;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of a run that was not aborted
#[derive(Debug, Clone, Default)]
pub struct ChunkOutput {
    pub chunks: Vec<Chunk>,
    /// Aggregate of the run's violations; never set in silent mode
    pub error: Option<ChunkerError>,
}

/// Turns documents into chunks using the active strategy
///
/// One engine serves one caller at a time. Its error log and counters are
/// mutated by every run; use one engine per thread for parallel work.
pub struct ChunkingEngine {
    config: ChunkerConfig,
    registry: StrategyRegistry,
    strategy: Arc<dyn ChunkingStrategy>,
    parser: Box<dyn Parser>,
    extractors: Vec<Box<dyn MetadataExtractor>>,
    errors: ErrorLog,
    stats: PerformanceStats,
}

impl ChunkingEngine {
    /// Create an engine; an invalid `config` is replaced by the default and
    /// the failure is left in the error log
    pub fn new(config: ChunkerConfig) -> Self {
        Self::with_registry(config, StrategyRegistry::new())
    }

    /// Create an engine resolving strategies through `registry`
    pub fn with_registry(config: ChunkerConfig, registry: StrategyRegistry) -> Self {
        let mut engine = Self {
            config: ChunkerConfig::default(),
            strategy: fallback_strategy(&registry),
            registry,
            parser: Box::new(MarkdownParser::new()),
            extractors: Vec::new(),
            errors: ErrorLog::new(),
            stats: PerformanceStats::default(),
        };
        // failures are recorded in the log
        let _ = engine.configure(config);
        engine
    }

    /// Install the link, image and code-block extractors
    pub fn with_default_extractors(mut self) -> Self {
        self.extractors.extend(default_extractors());
        self
    }

    pub fn with_parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn add_extractor(&mut self, extractor: impl MetadataExtractor + 'static) {
        self.extractors.push(Box::new(extractor));
    }

    /// Validate and apply `config`
    ///
    /// On failure the default configuration is installed instead and the
    /// `ConfigInvalid` error is both logged and returned.
    pub fn configure(&mut self, config: ChunkerConfig) -> Result<(), ChunkerError> {
        let built = config.validate().and_then(|()| {
            let strategy = &config.chunking_strategy;
            self.registry.create(&strategy.name, strategy)
        });

        match built {
            Ok(strategy) => {
                info!(strategy = %strategy.name(), "configured engine");
                self.strategy = strategy;
                self.config = config;
                Ok(())
            }
            Err(error) => {
                warn!("invalid configuration, using defaults: {}", error.message);
                self.errors.record(error.clone());
                self.config = ChunkerConfig::default();
                self.strategy = fallback_strategy(&self.registry);
                Err(error)
            }
        }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StrategyRegistry {
        &mut self.registry
    }

    /// Register a built strategy under `name` for later [`set_strategy`](Self::set_strategy)
    pub fn register_strategy(
        &mut self,
        name: impl Into<String>,
        strategy: impl ChunkingStrategy + 'static,
    ) {
        self.registry.register(name, strategy);
    }

    /// Replace the active strategy for subsequent runs
    ///
    /// An invalid configuration or unknown name leaves the current strategy
    /// in place; the error is logged and returned.
    pub fn set_strategy(
        &mut self,
        name: &str,
        mut config: StrategyConfig,
    ) -> Result<(), ChunkerError> {
        config.name = name.to_string();

        let built = config
            .validate()
            .and_then(|()| self.registry.create(name, &config));
        match built {
            Ok(strategy) => {
                info!(from = %self.strategy.name(), to = %name, "switched strategy");
                self.strategy = strategy;
                self.config.chunking_strategy = config;
                Ok(())
            }
            Err(error) => {
                warn!(strategy = %name, "rejected strategy: {}", error.message);
                self.errors.record(error.clone());
                Err(error)
            }
        }
    }

    /// The active strategy
    pub fn strategy(&self) -> &dyn ChunkingStrategy {
        self.strategy.as_ref()
    }

    /// Parse `source` and chunk it
    pub fn chunk_markdown(&mut self, source: &str) -> Result<ChunkOutput, ChunkerError> {
        if source.trim().is_empty() {
            return self.reject(ChunkerError::invalid_input("source is empty"));
        }
        let document = self.parser.parse(source);
        self.chunk(&document)
    }

    /// Chunk an already parsed document
    pub fn chunk(&mut self, document: &Document) -> Result<ChunkOutput, ChunkerError> {
        if document.is_blank() {
            return self.reject(ChunkerError::invalid_input("document has no content"));
        }

        let start = Instant::now();
        let strategy = Arc::clone(&self.strategy);
        let settings = AssemblySettings::resolve(&self.config, strategy.config());

        let mut assembler = ChunkAssembler::new(&settings, &self.extractors);
        let result = strategy
            .chunk(document, &mut assembler)
            .and_then(|()| assembler.finish());
        let assembly = assembler.into_assembly();

        self.errors.extend(assembly.errors.iter().cloned());
        let chunk_count = if result.is_ok() {
            assembly.chunks.len()
        } else {
            0
        };
        self.stats = PerformanceStats::measure(
            chunk_count,
            document.source.len(),
            assembly.peak_buffer_bytes,
            start.elapsed(),
        );

        info!(
            strategy = %strategy.name(),
            chunks = chunk_count,
            errors = assembly.errors.len(),
            elapsed_ms = self.stats.elapsed.as_millis() as u64,
            "chunked document"
        );

        result?;
        let error = match settings.error_handling {
            ErrorHandling::Silent => None,
            ErrorHandling::Strict | ErrorHandling::Permissive => {
                ChunkerError::aggregate(&assembly.errors)
            }
        };
        Ok(ChunkOutput {
            chunks: assembly.chunks,
            error,
        })
    }

    /// Every violation recorded since the last [`clear_errors`](Self::clear_errors)
    pub fn errors(&self) -> &[ChunkerError] {
        self.errors.all()
    }

    pub fn errors_by_type(&self, kind: ErrorKind) -> Vec<&ChunkerError> {
        self.errors.by_kind(kind)
    }

    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Counters from the most recent run
    pub fn stats(&self) -> &PerformanceStats {
        &self.stats
    }

    /// Record an input error and report it according to the handling mode
    fn reject(&mut self, error: ChunkerError) -> Result<ChunkOutput, ChunkerError> {
        warn!(kind = %error.kind, "{}", error.message);
        self.errors.record(error.clone());
        self.stats = PerformanceStats::default();

        match self.config.error_handling {
            ErrorHandling::Strict => Err(error),
            ErrorHandling::Permissive => Ok(ChunkOutput {
                chunks: Vec::new(),
                error: Some(error),
            }),
            ErrorHandling::Silent => Ok(ChunkOutput::default()),
        }
    }
}

impl Default for ChunkingEngine {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

/// Strategy for the default configuration
///
/// Falls back to a plain hierarchical strategy when the registry has no
/// usable entry for the default name.
fn fallback_strategy(registry: &StrategyRegistry) -> Arc<dyn ChunkingStrategy> {
    let config = StrategyConfig::default();
    registry
        .create(&config.name, &config)
        .unwrap_or_else(|_| Arc::new(super::HierarchicalStrategy::new(config)))
}
