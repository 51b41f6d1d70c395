use super::{ChunkAssembler, ChunkBuilder, ChunkingStrategy, DEFAULT_SEPARATOR};
use crate::config::StrategyConfig;
use crate::error::ChunkerError;
use crate::parser::{Document, Node, NodeKind};
use tracing::debug;

/// Groups each heading with the content beneath it
///
/// Headings deeper than `max_depth` are ordinary content. Content before
/// the first boundary heading lands in a `preamble` chunk. Sections are
/// handed to the assembler in document order, so undersized ones merge
/// forward into the next section at the same or a shallower level.
pub struct HierarchicalStrategy {
    config: StrategyConfig,
}

/// An open section on the heading stack
struct Section {
    /// Opening order, used to emit in document order
    seq: usize,
    builder: ChunkBuilder,
}

impl HierarchicalStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn max_depth(&self) -> u8 {
        self.config.max_depth
    }

    fn is_boundary(&self, node: &Node) -> bool {
        node.kind == NodeKind::Heading && node.level <= self.config.max_depth
    }

    /// Pop every section the heading at `level` closes
    fn close_sections(stack: &mut Vec<Section>, closed: &mut Vec<Section>, level: u8) {
        while stack
            .last()
            .is_some_and(|s| s.builder.level == 0 || s.builder.level >= level)
        {
            if let Some(section) = stack.pop() {
                closed.push(section);
            }
        }
    }

    fn open_section(
        assembler: &mut ChunkAssembler<'_>,
        stack: &[Section],
        node: &Node,
        seq: usize,
    ) -> Section {
        let mut path: Vec<&str> = stack
            .iter()
            .filter_map(|s| s.builder.metadata.get("heading").map(String::as_str))
            .collect();
        path.push(&node.text);
        let heading_path = path.join(" > ");

        let mut builder = assembler.builder(node, NodeKind::Heading.as_str(), true);
        builder
            .metadata
            .insert("heading".to_string(), node.text.clone());
        builder
            .metadata
            .insert("heading_path".to_string(), heading_path);

        debug!(level = node.level, heading = %node.text, "opened section");
        Section { seq, builder }
    }
}

impl ChunkingStrategy for HierarchicalStrategy {
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
        let mut stack: Vec<Section> = Vec::new();
        let mut closed: Vec<Section> = Vec::new();
        let mut seq = 0;

        for node in &document.nodes {
            if !assembler.accepts(node.kind) {
                continue;
            }

            if self.is_boundary(node) {
                Self::close_sections(&mut stack, &mut closed, node.level);
                let section = Self::open_section(assembler, &stack, node, seq);
                stack.push(section);
                seq += 1;
                continue;
            }

            match stack.last_mut() {
                Some(section) => {
                    assembler.append(&mut section.builder, node, DEFAULT_SEPARATOR, true);
                }
                None => {
                    let mut builder = ChunkBuilder::new("preamble", 0, node.position);
                    assembler.append(&mut builder, node, DEFAULT_SEPARATOR, true);
                    stack.push(Section { seq, builder });
                    seq += 1;
                }
            }
        }

        // remaining sections close deepest first
        while let Some(section) = stack.pop() {
            closed.push(section);
        }
        closed.sort_by_key(|s| s.seq);

        for section in closed {
            assembler.emit(section.builder)?;
        }
        assembler.finish()
    }
}
