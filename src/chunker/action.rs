use super::{ChunkAssembler, DEFAULT_SEPARATOR};
use crate::error::ChunkerError;
use crate::parser::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placement decision applied when a rule matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Close the open chunk and start a new one seeded with the node
    CreateSeparateChunk {
        /// Chunk type; empty means the node kind
        #[serde(default)]
        label: String,
        /// Merged into the new chunk's metadata at creation
        #[serde(default)]
        metadata: BTreeMap<String, String>,
        /// Serialize the node's whole subtree into the chunk and skip its children
        #[serde(default = "default_whole_subtree")]
        whole_subtree: bool,
    },
    /// Append the node to the open chunk
    MergeWithParent {
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_whole_subtree() -> bool {
    true
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

/// Whether traversal continues into a node's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Descend,
    SkipChildren,
}

impl Action {
    pub fn separate_chunk(label: impl Into<String>) -> Self {
        Action::CreateSeparateChunk {
            label: label.into(),
            metadata: BTreeMap::new(),
            whole_subtree: true,
        }
    }

    pub fn separate_chunk_with(
        label: impl Into<String>,
        metadata: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Action::CreateSeparateChunk {
            label: label.into(),
            metadata: metadata.into_iter().collect(),
            whole_subtree: true,
        }
    }

    pub fn merge_with_parent(separator: impl Into<String>) -> Self {
        Action::MergeWithParent {
            separator: separator.into(),
        }
    }

    pub fn apply(
        &self,
        node: &Node,
        assembler: &mut ChunkAssembler<'_>,
    ) -> Result<Traversal, ChunkerError> {
        match self {
            Action::CreateSeparateChunk {
                label,
                metadata,
                whole_subtree,
            } => {
                let label = if label.is_empty() {
                    node.kind.as_str()
                } else {
                    label.as_str()
                };
                assembler.open_chunk(node, label, metadata, *whole_subtree)?;

                if *whole_subtree {
                    Ok(Traversal::SkipChildren)
                } else {
                    Ok(Traversal::Descend)
                }
            }
            Action::MergeWithParent { separator } => {
                assembler.merge_into_open(node, separator)?;
                Ok(Traversal::Descend)
            }
        }
    }
}
