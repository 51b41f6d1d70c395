use super::node::{Document, Node, NodeKind, Point, Position};
use super::Parser;
use pulldown_cmark::{Event, Options, Parser as CmarkParser, Tag};
use std::ops::Range;

/// CommonMark + GFM front-end built on pulldown-cmark
pub struct MarkdownParser {
    options: Options,
}

impl MarkdownParser {
    /// Create a parser with tables, footnotes, strikethrough and task lists
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for MarkdownParser {
    fn parse(&self, source: &str) -> Document {
        let mut builder = TreeBuilder::new(source);
        for (event, range) in CmarkParser::new_ext(source, self.options).into_offset_iter() {
            builder.event(event, range);
        }
        Document::new(source, builder.finish())
    }
}

/// What an open tag contributes to the tree
#[derive(Debug, Clone, Copy)]
enum Role {
    Block(NodeKind, u8),
    Item,
    Row,
    Cell,
    Inline,
}

fn role_for(tag: &Tag<'_>) -> Role {
    match tag {
        Tag::Heading { level, .. } => Role::Block(NodeKind::Heading, *level as u8),
        Tag::Paragraph | Tag::HtmlBlock => Role::Block(NodeKind::Paragraph, 0),
        Tag::CodeBlock(_) => Role::Block(NodeKind::Code, 0),
        Tag::Table(_) => Role::Block(NodeKind::Table, 0),
        Tag::List(_) => Role::Block(NodeKind::List, 0),
        Tag::BlockQuote(_) => Role::Block(NodeKind::Blockquote, 0),
        Tag::Item => Role::Item,
        Tag::TableHead | Tag::TableRow => Role::Row,
        Tag::TableCell => Role::Cell,
        _ => Role::Inline,
    }
}

struct Frame {
    role: Role,
    range: Range<usize>,
    text: String,
    children: Vec<Node>,
}

/// Folds the flat event stream into nested block nodes
struct TreeBuilder<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
    stack: Vec<Frame>,
    roots: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            source,
            line_starts,
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.stack.push(Frame {
                role: role_for(&tag),
                range,
                text: String::new(),
                children: Vec::new(),
            }),
            Event::End(_) => self.close(),
            Event::Text(text) | Event::Code(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.push_text(&text)
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_text("\n"),
            Event::Rule => {
                let node = self.node(NodeKind::ThematicBreak, 0, range, String::new(), Vec::new());
                self.attach(node);
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.stack.is_empty() {
            self.close();
        }
        self.roots
    }

    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };

        match frame.role {
            Role::Inline => {
                self.push_text(&frame.text);
                self.attach_all(frame.children);
            }
            Role::Cell => self.join_text(&frame.text, " | "),
            Role::Row => self.join_text(&frame.text, "\n"),
            Role::Item => self.close_item(frame),
            Role::Block(kind, level) => {
                let text = if kind.is_container() {
                    frame
                        .children
                        .iter()
                        .map(|c| c.text.as_str())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join("\n")
                } else if kind == NodeKind::Code {
                    frame.text.trim_end().to_string()
                } else {
                    frame.text.trim().to_string()
                };
                let node = self.node(kind, level, frame.range, text, frame.children);
                self.attach(node);
            }
        }
    }

    /// List items are flattened into the list; loose inline text becomes a paragraph
    fn close_item(&mut self, frame: Frame) {
        let mut children = frame.children;
        let text = frame.text.trim();

        if !text.is_empty() {
            let end = children
                .first()
                .map(|c| c.position.start.offset)
                .unwrap_or(frame.range.end);
            let paragraph = self.node(
                NodeKind::Paragraph,
                0,
                frame.range.start..end,
                text.to_string(),
                Vec::new(),
            );
            children.insert(0, paragraph);
        }

        self.attach_all(children);
    }

    fn push_text(&mut self, text: &str) {
        if let Some(top) = self.stack.last_mut() {
            top.text.push_str(text);
        }
    }

    fn join_text(&mut self, text: &str, separator: &str) {
        if let Some(top) = self.stack.last_mut() {
            if !top.text.is_empty() && !text.is_empty() {
                top.text.push_str(separator);
            }
            top.text.push_str(text);
        }
    }

    fn attach(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(top) => top.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn attach_all(&mut self, nodes: Vec<Node>) {
        for node in nodes {
            self.attach(node);
        }
    }

    fn node(
        &self,
        kind: NodeKind,
        level: u8,
        range: Range<usize>,
        text: String,
        children: Vec<Node>,
    ) -> Node {
        let raw = self
            .source
            .get(range.clone())
            .unwrap_or("")
            .trim_end_matches(|c| c == '\n' || c == '\r');
        let end = range.start + raw.len();

        Node {
            kind,
            level,
            position: Position::new(self.point(range.start), self.point(end)),
            raw: raw.to_string(),
            text,
            children,
        }
    }

    fn point(&self, offset: usize) -> Point {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self
            .line_starts
            .get(line.saturating_sub(1))
            .copied()
            .unwrap_or(0);

        Point {
            line,
            column: offset - line_start + 1,
            offset,
        }
    }
}
