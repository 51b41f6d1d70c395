use crate::parser::{Node, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Predicate deciding whether a rule applies to a node
///
/// Conditions are pure: they see only the node itself and whether the
/// assembler currently holds an open chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Heading whose depth lies in `min..=max`
    HeadingLevel { min: u8, max: u8 },
    /// Node kind is one of `kinds`
    ContentType { kinds: BTreeSet<NodeKind> },
    /// Raw content length (chars) in `min..=max`; `max == 0` is unbounded
    ContentSize {
        #[serde(default)]
        min: usize,
        #[serde(default)]
        max: usize,
    },
    /// Matches on whether a chunk is currently open
    OpenChunk { open: bool },
}

impl Condition {
    pub fn heading_level(min: u8, max: u8) -> Self {
        Condition::HeadingLevel { min, max }
    }

    pub fn content_type(kinds: impl IntoIterator<Item = NodeKind>) -> Self {
        Condition::ContentType {
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn content_size(min: usize, max: usize) -> Self {
        Condition::ContentSize { min, max }
    }

    pub fn open_chunk(open: bool) -> Self {
        Condition::OpenChunk { open }
    }

    pub fn matches(&self, node: &Node, has_open_chunk: bool) -> bool {
        match self {
            Condition::HeadingLevel { min, max } => {
                node.kind == NodeKind::Heading && (*min..=*max).contains(&node.level)
            }
            Condition::ContentType { kinds } => kinds.contains(&node.kind),
            Condition::ContentSize { min, max } => {
                let size = node.size();
                size >= *min && (*max == 0 || size <= *max)
            }
            Condition::OpenChunk { open } => *open == has_open_chunk,
        }
    }

    /// Reject conditions that can never match
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Condition::HeadingLevel { min, max } if min > max => Err(format!(
                "heading level range {}..={} is empty",
                min, max
            )),
            Condition::HeadingLevel { min, .. } if *min > 6 => {
                Err(format!("heading level {} exceeds 6", min))
            }
            Condition::ContentType { kinds } if kinds.is_empty() => {
                Err("content type condition lists no kinds".to_string())
            }
            Condition::ContentSize { min, max } if *max != 0 && min > max => Err(format!(
                "content size range {}..={} is empty",
                min, max
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{MarkdownParser, Parser};

    fn nodes(source: &str) -> Vec<Node> {
        MarkdownParser::new().parse(source).nodes
    }

    #[test]
    fn test_heading_level_range() {
        let doc = nodes("# One\n\n## Two\n\n### Three\n\ntext\n");
        let cond = Condition::heading_level(1, 2);

        assert!(cond.matches(&doc[0], false));
        assert!(cond.matches(&doc[1], false));
        assert!(!cond.matches(&doc[2], false));
        assert!(!cond.matches(&doc[3], false));
    }

    #[test]
    fn test_content_type() {
        let doc = nodes("# H\n\n```\ncode\n```\n\npara\n");
        let cond = Condition::content_type([NodeKind::Code, NodeKind::Table]);

        assert!(!cond.matches(&doc[0], false));
        assert!(cond.matches(&doc[1], false));
        assert!(!cond.matches(&doc[2], true));
    }

    #[test]
    fn test_content_size_bounds() {
        let doc = nodes("short\n\nthis paragraph is a good deal longer\n");

        let small = Condition::content_size(0, 10);
        assert!(small.matches(&doc[0], false));
        assert!(!small.matches(&doc[1], false));

        let unbounded = Condition::content_size(10, 0);
        assert!(!unbounded.matches(&doc[0], false));
        assert!(unbounded.matches(&doc[1], false));

        let exact = Condition::content_size(5, 5);
        assert!(exact.matches(&doc[0], false));
    }

    #[test]
    fn test_open_chunk() {
        let doc = nodes("para\n");
        assert!(Condition::open_chunk(true).matches(&doc[0], true));
        assert!(!Condition::open_chunk(true).matches(&doc[0], false));
        assert!(Condition::open_chunk(false).matches(&doc[0], false));
    }

    #[test]
    fn test_validate() {
        assert!(Condition::heading_level(1, 3).validate().is_ok());
        assert!(Condition::heading_level(3, 1).validate().is_err());
        assert!(Condition::heading_level(7, 9).validate().is_err());
        assert!(Condition::content_type([]).validate().is_err());
        assert!(Condition::content_size(10, 0).validate().is_ok());
        assert!(Condition::content_size(10, 5).validate().is_err());
    }

    #[test]
    fn test_deserialize_tagged() {
        let cond: Condition =
            serde_json::from_str(r#"{"type":"content_type","kinds":["code","table"]}"#).unwrap();
        assert_eq!(
            cond,
            Condition::content_type([NodeKind::Code, NodeKind::Table])
        );

        let cond: Condition = serde_json::from_str(r#"{"type":"content_size","min":3}"#).unwrap();
        assert_eq!(cond, Condition::content_size(3, 0));
    }
}
