use super::{ChunkId, HASH_PREFIX_LEN};
use crate::parser::{Node, Position};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A finalized unit of output ready for indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Insertion order within one run, starting at 0
    pub id: ChunkId,
    /// Node kind or strategy label (e.g. "preamble", "document")
    #[serde(rename = "type")]
    pub chunk_type: String,
    /// Heading depth for heading-derived chunks, otherwise 0
    pub level: u8,
    /// Raw accumulated source
    pub content: String,
    /// Accumulated plain text
    pub text: String,
    /// Span covering every contributing node
    pub position: Position,
    /// Truncated SHA-256 of `content`
    pub hash: String,
    pub metadata: BTreeMap<String, String>,
    pub links: Vec<LinkRef>,
    pub images: Vec<ImageRef>,
}

impl Chunk {
    pub fn size(&self) -> usize {
        self.content.chars().count()
    }
}

/// A hyperlink found in a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub text: String,
    pub url: String,
}

/// An image reference found in a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub alt: String,
    pub src: String,
}

/// Mutable buffer for a chunk that is still open
///
/// Owned exclusively by whoever is accumulating it until it is handed to
/// [`ChunkAssembler::finalize`](super::ChunkAssembler::finalize).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkBuilder {
    pub chunk_type: String,
    pub level: u8,
    pub content: String,
    pub text: String,
    pub position: Position,
    pub metadata: BTreeMap<String, String>,
}

impl ChunkBuilder {
    /// Create an empty builder anchored at `position`
    pub fn new(chunk_type: impl Into<String>, level: u8, position: Position) -> Self {
        Self {
            chunk_type: chunk_type.into(),
            level,
            content: String::new(),
            text: String::new(),
            position,
            metadata: BTreeMap::new(),
        }
    }

    /// Seed a builder from a node
    ///
    /// With `whole_subtree` unset, a container contributes only its own
    /// content (nothing) and its children are expected to be appended later.
    pub fn from_node(node: &Node, label: &str, whole_subtree: bool) -> Self {
        let mut builder = Self::new(label, node.level, node.position);
        if whole_subtree || !node.has_children() {
            builder.content = node.raw.clone();
            builder.text = node.text.clone();
        }
        builder
    }

    /// Append a node using `separator` as the join delimiter
    pub fn append_node(&mut self, node: &Node, separator: &str, whole_subtree: bool) {
        if whole_subtree || !node.has_children() {
            self.push(&node.raw, &node.text, separator);
        }
        self.position.cover(&node.position);
    }

    /// Prepend an earlier, undersized builder to this one
    pub fn absorb_front(&mut self, earlier: ChunkBuilder, separator: &str) {
        let merged = merged_count(&self.metadata) + merged_count(&earlier.metadata) + 1;

        self.content = join(&earlier.content, &self.content, separator);
        self.text = join(&earlier.text, &self.text, separator);
        self.position.cover(&earlier.position);
        self.metadata
            .insert("merged_chunks".to_string(), merged.to_string());
    }

    pub fn size(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    fn push(&mut self, content: &str, text: &str, separator: &str) {
        if !content.is_empty() {
            if !self.content.is_empty() {
                self.content.push_str(separator);
            }
            self.content.push_str(content);
        }
        if !text.is_empty() {
            if !self.text.is_empty() {
                self.text.push_str(separator);
            }
            self.text.push_str(text);
        }
    }
}

fn merged_count(metadata: &BTreeMap<String, String>) -> usize {
    metadata
        .get("merged_chunks")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn join(first: &str, second: &str, separator: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{}{}{}", first, separator, second),
    }
}

/// Fingerprint chunk content: leading hex chars of its SHA-256
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(HASH_PREFIX_LEN);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{MarkdownParser, Parser};

    #[test]
    fn test_content_hash_is_stable_prefix() {
        let a = content_hash("hello");
        assert_eq!(a.len(), HASH_PREFIX_LEN);
        assert_eq!(a, content_hash("hello"));
        assert_ne!(a, content_hash("hello!"));
        // sha256("hello") = 2cf24dba5fb0a30e...
        assert_eq!(a, "2cf24dba5fb0a30e");
    }

    #[test]
    fn test_builder_appends_with_separator() {
        let doc = MarkdownParser::new().parse("# A\n\none\n\ntwo\n");
        let mut builder = ChunkBuilder::from_node(&doc.nodes[0], "heading", true);
        builder.append_node(&doc.nodes[1], "\n\n", true);
        builder.append_node(&doc.nodes[2], "\n\n", true);

        assert_eq!(builder.content, "# A\n\none\n\ntwo");
        assert_eq!(builder.text, "A\n\none\n\ntwo");
        assert_eq!(builder.level, 1);
        assert_eq!(builder.position.end, doc.nodes[2].position.end);
    }

    #[test]
    fn test_container_without_subtree_seeds_empty() {
        let doc = MarkdownParser::new().parse("- a\n- b\n");
        let builder = ChunkBuilder::from_node(&doc.nodes[0], "list", false);
        assert!(builder.content.is_empty());
        assert!(builder.is_blank());

        let whole = ChunkBuilder::from_node(&doc.nodes[0], "list", true);
        assert_eq!(whole.content, "- a\n- b");
    }

    #[test]
    fn test_absorb_front_counts_merges() {
        let pos = Position::default();
        let mut first = ChunkBuilder::new("heading", 2, pos);
        first.content = "## A".to_string();
        let mut second = ChunkBuilder::new("heading", 2, pos);
        second.content = "## B".to_string();
        let mut third = ChunkBuilder::new("heading", 2, pos);
        third.content = "## C\n\nbody".to_string();

        second.absorb_front(first, "\n\n");
        third.absorb_front(second, "\n\n");

        assert_eq!(third.content, "## A\n\n## B\n\n## C\n\nbody");
        assert_eq!(third.metadata["merged_chunks"], "2");
    }
}
