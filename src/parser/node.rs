use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of block-level nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// ATX or setext heading
    Heading,
    /// Paragraph (HTML blocks are folded in here)
    Paragraph,
    /// Fenced or indented code block
    Code,
    /// GFM table
    Table,
    /// Ordered or unordered list
    List,
    /// Block quote
    Blockquote,
    /// Horizontal rule
    ThematicBreak,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Heading,
        NodeKind::Paragraph,
        NodeKind::Code,
        NodeKind::Table,
        NodeKind::List,
        NodeKind::Blockquote,
        NodeKind::ThematicBreak,
    ];

    /// Label used as the chunk type for node-derived chunks
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Heading => "heading",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Code => "code",
            NodeKind::Table => "table",
            NodeKind::List => "list",
            NodeKind::Blockquote => "blockquote",
            NodeKind::ThematicBreak => "thematic_break",
        }
    }

    /// Containers hold other blocks as children
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::List | NodeKind::Blockquote)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    /// 1-based line number
    pub line: usize,
    /// 1-based byte column
    pub column: usize,
    /// Byte offset from the start of the source
    pub offset: usize,
}

/// Span between two source points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

impl Position {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Grow this span so that it also covers `other`
    pub fn cover(&mut self, other: &Position) {
        if other.start.offset < self.start.offset {
            self.start = other.start;
        }
        if other.end.offset > self.end.offset {
            self.end = other.end;
        }
    }
}

/// A block node of the parsed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Heading depth 1-6, 0 for every other kind
    pub level: u8,
    pub position: Position,
    /// Exact source slice (trailing line breaks removed)
    pub raw: String,
    /// Rendered plain text
    pub text: String,
    pub children: Vec<Node>,
}

impl Node {
    /// Length used by every size check in the engine
    pub fn size(&self) -> usize {
        self.raw.chars().count()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// This node followed by all descendants, pre-order
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    /// Report inconsistent column counts in a table's rows
    ///
    /// Returns `None` for non-table nodes and well-formed tables.
    pub fn table_issue(&self) -> Option<String> {
        if self.kind != NodeKind::Table {
            return None;
        }

        let counts: Vec<usize> = self
            .raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(count_cells)
            .collect();

        let expected = *counts.first()?;
        counts
            .iter()
            .enumerate()
            .find(|(_, count)| **count != expected)
            .map(|(row, count)| {
                format!(
                    "table row {} has {} column(s), header has {}",
                    row + 1,
                    count,
                    expected
                )
            })
    }
}

/// Count pipe-separated cells in one table row, honouring `\|` escapes
fn count_cells(row: &str) -> usize {
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = if row.ends_with('|') && !row.ends_with("\\|") {
        &row[..row.len() - 1]
    } else {
        row
    };

    let mut cells = 1;
    let mut escaped = false;
    for c in row.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            '|' if !escaped => cells += 1,
            _ => escaped = false,
        }
    }
    cells
}

/// A parsed document: the source plus its top-level block nodes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub source: String,
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new(source: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            source: source.into(),
            nodes,
        }
    }

    /// Whether the source holds anything but whitespace
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// Span covering the whole source
    pub fn full_position(&self) -> Position {
        let start = Point {
            line: 1,
            column: 1,
            offset: 0,
        };
        let mut end = start;
        for c in self.source.chars() {
            if c == '\n' {
                end.line += 1;
                end.column = 1;
            } else {
                end.column += c.len_utf8();
            }
            end.offset += c.len_utf8();
        }
        Position::new(start, end)
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown node kind '{}'", s))
    }
}
