mod markdown;
mod node;

#[cfg(test)]
mod tests;

pub use markdown::MarkdownParser;
pub use node::{Document, Node, NodeKind, Point, Position};

/// Core trait for front-ends that turn source text into a document tree
pub trait Parser: Send + Sync {
    /// Parse source text into an immutable tree of block nodes
    ///
    /// # Arguments
    /// * `source` - Complete source text; node spans index into it
    ///
    /// # Returns
    /// The document, owning a copy of the source and its top-level nodes
    fn parse(&self, source: &str) -> Document;
}
