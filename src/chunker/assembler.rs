use super::types::content_hash;
use super::{Chunk, ChunkBuilder, ChunkId, DEFAULT_SEPARATOR};
use crate::config::{ChunkerConfig, ErrorHandling, StrategyConfig};
use crate::error::ChunkerError;
use crate::extractors::MetadataExtractor;
use crate::parser::{Node, NodeKind};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Effective limits and filters for one run
///
/// Strategy-level size settings override the engine-wide ones.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySettings {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub merge_empty: bool,
    pub filter_empty_chunks: bool,
    pub preserve_whitespace: bool,
    pub enabled_types: BTreeSet<NodeKind>,
    /// Empty means every enabled kind
    pub include_types: BTreeSet<NodeKind>,
    pub error_handling: ErrorHandling,
    /// Bytes of emitted content allowed per run, 0 for unbounded
    pub memory_limit: usize,
}

impl AssemblySettings {
    pub fn resolve(config: &ChunkerConfig, strategy: &StrategyConfig) -> Self {
        Self {
            max_chunk_size: strategy.max_chunk_size.unwrap_or(config.max_chunk_size),
            min_chunk_size: strategy.min_chunk_size.unwrap_or(config.min_chunk_size),
            merge_empty: strategy.merge_empty.unwrap_or(config.merge_empty),
            filter_empty_chunks: config.filter_empty_chunks,
            preserve_whitespace: config.preserve_whitespace,
            enabled_types: config.enabled_types.clone(),
            include_types: strategy.include_types.clone(),
            error_handling: config.error_handling,
            memory_limit: config.memory_limit,
        }
    }

    /// Whether nodes of `kind` may contribute content
    pub fn accepts(&self, kind: NodeKind) -> bool {
        self.enabled_types.contains(&kind)
            && (self.include_types.is_empty() || self.include_types.contains(&kind))
    }
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self::resolve(&ChunkerConfig::default(), &StrategyConfig::default())
    }
}

/// Everything an assembler produced during one run
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub chunks: Vec<Chunk>,
    pub errors: Vec<ChunkerError>,
    pub peak_buffer_bytes: usize,
}

/// Owns the in-progress chunk buffer and turns builders into chunks
///
/// Closed builders pass through [`emit`](Self::emit), which merges
/// undersized ones forward. Finalization then runs in a fixed order: drop
/// empty, trim, enforce the size limit, check the memory budget, hash, run
/// extractors, append. Every violation is logged; strict
/// mode additionally turns fatal ones into an `Err` that aborts the run.
pub struct ChunkAssembler<'a> {
    settings: &'a AssemblySettings,
    extractors: &'a [Box<dyn MetadataExtractor>],
    open: Option<ChunkBuilder>,
    /// Closed but undersized chunk waiting to be merged forward
    carry: Option<ChunkBuilder>,
    output: Vec<Chunk>,
    errors: Vec<ChunkerError>,
    next_id: ChunkId,
    emitted_bytes: usize,
    peak_buffer_bytes: usize,
    exhausted: bool,
}

impl<'a> ChunkAssembler<'a> {
    pub fn new(
        settings: &'a AssemblySettings,
        extractors: &'a [Box<dyn MetadataExtractor>],
    ) -> Self {
        Self {
            settings,
            extractors,
            open: None,
            carry: None,
            output: Vec::new(),
            errors: Vec::new(),
            next_id: 0,
            emitted_bytes: 0,
            peak_buffer_bytes: 0,
            exhausted: false,
        }
    }

    pub fn settings(&self) -> &AssemblySettings {
        self.settings
    }

    pub fn accepts(&self, kind: NodeKind) -> bool {
        self.settings.accepts(kind)
    }

    pub fn has_open_chunk(&self) -> bool {
        self.open.is_some()
    }

    /// Chunks appended so far
    pub fn chunks(&self) -> &[Chunk] {
        &self.output
    }

    /// Log a violation; in strict mode a fatal one is returned as `Err`
    pub fn record(&mut self, error: ChunkerError) -> Result<(), ChunkerError> {
        warn!(kind = %error.kind, "{}", error.message);
        self.errors.push(error.clone());

        if self.settings.error_handling == ErrorHandling::Strict && error.kind.is_fatal() {
            return Err(error);
        }
        Ok(())
    }

    /// Seed a new builder from `node`, checking it for structural problems
    pub fn builder(&mut self, node: &Node, label: &str, whole_subtree: bool) -> ChunkBuilder {
        let mut builder = ChunkBuilder::from_node(node, label, whole_subtree);
        self.inspect(&mut builder, node, whole_subtree);
        builder
    }

    /// Append `node` to a builder, checking it for structural problems
    pub fn append(
        &mut self,
        builder: &mut ChunkBuilder,
        node: &Node,
        separator: &str,
        whole_subtree: bool,
    ) {
        builder.append_node(node, separator, whole_subtree);
        self.inspect(builder, node, whole_subtree);
    }

    /// Attach parse problems of `node` (and optionally its subtree) to `builder`
    pub fn inspect(&mut self, builder: &mut ChunkBuilder, node: &Node, whole_subtree: bool) {
        let nodes = if whole_subtree {
            node.descendants()
        } else {
            vec![node]
        };

        for n in nodes {
            if let Some(issue) = n.table_issue() {
                builder
                    .metadata
                    .insert("parse_error".to_string(), issue.clone());
                let error = ChunkerError::parsing_failed(issue)
                    .with_context("node_kind", n.kind.as_str())
                    .with_context("line", n.position.start.line);
                // never fatal
                let _ = self.record(error);
            }
        }
    }

    /// Close any open chunk, then open a new one seeded with `node`
    pub fn open_chunk(
        &mut self,
        node: &Node,
        label: &str,
        metadata: &BTreeMap<String, String>,
        whole_subtree: bool,
    ) -> Result<(), ChunkerError> {
        self.close_open()?;

        let mut builder = self.builder(node, label, whole_subtree);
        builder
            .metadata
            .extend(metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        debug!(label, line = node.position.start.line, "opened chunk");
        self.open = Some(builder);
        Ok(())
    }

    /// Append `node`'s own content to the open chunk, opening one if needed
    pub fn merge_into_open(&mut self, node: &Node, separator: &str) -> Result<(), ChunkerError> {
        match self.open.take() {
            Some(mut builder) => {
                self.append(&mut builder, node, separator, false);
                self.open = Some(builder);
                Ok(())
            }
            None => self.open_chunk(node, node.kind.as_str(), &BTreeMap::new(), false),
        }
    }

    pub fn close_open(&mut self) -> Result<(), ChunkerError> {
        match self.open.take() {
            Some(builder) => self.emit(builder),
            None => Ok(()),
        }
    }

    /// Hand a closed builder over for output, merging undersized ones forward
    ///
    /// With `merge_empty` and a minimum size set, a short chunk is held back
    /// and carried into the next one when that one is at the same or a
    /// shallower level; otherwise the short chunk is finalized on its own.
    /// The carry cascades while the merged result stays under the minimum.
    pub fn emit(&mut self, mut builder: ChunkBuilder) -> Result<(), ChunkerError> {
        if self.settings.filter_empty_chunks && builder.is_blank() {
            debug!(chunk_type = %builder.chunk_type, "dropped empty chunk");
            return Ok(());
        }

        if let Some(short) = self.carry.take() {
            if builder.level <= short.level {
                debug!(from = short.level, into = builder.level, "merged short chunk forward");
                builder.absorb_front(short, DEFAULT_SEPARATOR);
            } else {
                self.finalize(short)?;
            }
        }

        let min = self.settings.min_chunk_size;
        if self.settings.merge_empty && min > 0 && builder.size() < min {
            self.carry = Some(builder);
            return Ok(());
        }
        self.finalize(builder)
    }

    /// Close the open chunk and release any carried short chunk
    pub fn finish(&mut self) -> Result<(), ChunkerError> {
        self.close_open()?;
        match self.carry.take() {
            Some(short) => self.finalize(short),
            None => Ok(()),
        }
    }

    /// Turn a builder into an immutable chunk and append it to the output
    pub fn finalize(&mut self, mut builder: ChunkBuilder) -> Result<(), ChunkerError> {
        if self.settings.filter_empty_chunks && builder.is_blank() {
            debug!(chunk_type = %builder.chunk_type, "dropped empty chunk");
            return Ok(());
        }
        if self.exhausted {
            return Ok(());
        }

        if !self.settings.preserve_whitespace {
            builder.content = builder.content.trim().to_string();
            builder.text = builder.text.trim().to_string();
        }

        let max = self.settings.max_chunk_size;
        let size = builder.size();
        if max > 0 && size > max {
            self.record(ChunkerError::chunk_too_large(&builder.chunk_type, size, max))?;
            builder.content = builder.content.chars().take(max).collect();
            builder.text = builder.text.chars().take(max).collect();
            builder
                .metadata
                .insert("truncated".to_string(), "true".to_string());
            builder
                .metadata
                .insert("original_size".to_string(), size.to_string());
        }

        let bytes = builder.content.len();
        let limit = self.settings.memory_limit;
        if limit > 0 && self.emitted_bytes + bytes > limit {
            self.exhausted = true;
            return self.record(ChunkerError::memory_exhausted(
                self.emitted_bytes + bytes,
                limit,
            ));
        }
        self.peak_buffer_bytes = self.peak_buffer_bytes.max(self.emitted_bytes + bytes);

        let mut chunk = Chunk {
            id: self.next_id,
            chunk_type: builder.chunk_type,
            level: builder.level,
            hash: content_hash(&builder.content),
            content: builder.content,
            text: builder.text,
            position: builder.position,
            metadata: builder.metadata,
            links: Vec::new(),
            images: Vec::new(),
        };

        for extractor in self.extractors {
            let extraction = extractor.extract(&chunk);
            chunk.metadata.extend(extraction.metadata);
            chunk.links.extend(extraction.links);
            chunk.images.extend(extraction.images);
        }

        debug!(id = chunk.id, chunk_type = %chunk.chunk_type, size = chunk.size(), "emitted chunk");
        self.emitted_bytes += bytes;
        self.next_id += 1;
        self.output.push(chunk);
        Ok(())
    }

    pub fn into_assembly(self) -> Assembly {
        Assembly {
            chunks: self.output,
            errors: self.errors,
            peak_buffer_bytes: self.peak_buffer_bytes,
        }
    }
}
