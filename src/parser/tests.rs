use super::*;

fn parse(source: &str) -> Document {
    MarkdownParser::new().parse(source)
}

// ========================================================================
// Block structure
// ========================================================================

#[test]
fn test_parse_headings_and_paragraphs() {
    let doc = parse("# Title\n\nIntro text.\n\n## Section\n\nBody.\n");

    let kinds: Vec<NodeKind> = doc.nodes.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Heading,
            NodeKind::Paragraph,
            NodeKind::Heading,
            NodeKind::Paragraph
        ]
    );
    assert_eq!(doc.nodes[0].level, 1);
    assert_eq!(doc.nodes[0].text, "Title");
    assert_eq!(doc.nodes[0].raw, "# Title");
    assert_eq!(doc.nodes[2].level, 2);
    assert_eq!(doc.nodes[1].level, 0);
}

#[test]
fn test_parse_positions() {
    let doc = parse("# Title\n\nSecond line para\n");

    let heading = &doc.nodes[0];
    assert_eq!(heading.position.start.line, 1);
    assert_eq!(heading.position.start.column, 1);
    assert_eq!(heading.position.start.offset, 0);

    let para = &doc.nodes[1];
    assert_eq!(para.position.start.line, 3);
    assert_eq!(para.position.start.offset, 9);
    assert_eq!(para.position.end.offset, 9 + "Second line para".len());
}

#[test]
fn test_parse_code_block() {
    let doc = parse("```rust\nfn main() {}\n```\n");

    assert_eq!(doc.nodes.len(), 1);
    let code = &doc.nodes[0];
    assert_eq!(code.kind, NodeKind::Code);
    assert_eq!(code.text, "fn main() {}");
    assert!(code.raw.starts_with("```rust"));
    assert!(code.raw.ends_with("```"));
}

#[test]
fn test_parse_thematic_break() {
    let doc = parse("before\n\n---\n\nafter\n");
    assert_eq!(doc.nodes.len(), 3);
    assert_eq!(doc.nodes[1].kind, NodeKind::ThematicBreak);
    assert_eq!(doc.nodes[1].raw, "---");
}

#[test]
fn test_parse_tight_list_items_become_paragraphs() {
    let doc = parse("- one\n- two\n- three\n");

    assert_eq!(doc.nodes.len(), 1);
    let list = &doc.nodes[0];
    assert_eq!(list.kind, NodeKind::List);
    assert_eq!(list.children.len(), 3);
    assert!(list.children.iter().all(|c| c.kind == NodeKind::Paragraph));
    assert_eq!(list.children[1].text, "two");
    assert_eq!(list.text, "one\ntwo\nthree");
}

#[test]
fn test_parse_nested_list() {
    let doc = parse("- outer\n  - inner\n");

    let list = &doc.nodes[0];
    assert_eq!(list.children.len(), 2);
    assert_eq!(list.children[0].kind, NodeKind::Paragraph);
    assert_eq!(list.children[1].kind, NodeKind::List);
    assert_eq!(list.children[1].children[0].text, "inner");
}

#[test]
fn test_parse_blockquote_children() {
    let doc = parse("> quoted\n>\n> # inner heading\n");

    let quote = &doc.nodes[0];
    assert_eq!(quote.kind, NodeKind::Blockquote);
    assert_eq!(quote.children.len(), 2);
    assert_eq!(quote.children[1].kind, NodeKind::Heading);
    assert_eq!(quote.descendants().len(), 3);
}

#[test]
fn test_parse_table_text() {
    let doc = parse("| a | b |\n|---|---|\n| 1 | 2 |\n");

    let table = &doc.nodes[0];
    assert_eq!(table.kind, NodeKind::Table);
    assert_eq!(table.text, "a | b\n1 | 2");
    assert!(table.table_issue().is_none());
}

#[test]
fn test_table_issue_detects_ragged_rows() {
    let doc = parse("| a | b |\n|---|---|\n| 1 | 2 | 3 |\n");

    let table = &doc.nodes[0];
    let issue = table.table_issue();
    assert!(issue.is_some());
    assert!(issue.unwrap().contains("row 3"));
}

#[test]
fn test_table_issue_ignores_escaped_pipes() {
    let doc = parse("| a | b |\n|---|---|\n| x \\| y | 2 |\n");
    assert!(doc.nodes[0].table_issue().is_none());
}

#[test]
fn test_inline_markup_is_rendered_to_text() {
    let doc = parse("Some *emphasis* and `code` and [a link](http://x.y).\n");
    assert_eq!(doc.nodes[0].text, "Some emphasis and code and a link.");
}

// ========================================================================
// Document helpers
// ========================================================================

#[test]
fn test_empty_document() {
    let doc = parse("");
    assert!(doc.nodes.is_empty());
    assert!(doc.is_blank());

    let doc = parse("   \n\n");
    assert!(doc.is_blank());
}

#[test]
fn test_full_position() {
    let doc = parse("ab\ncd");
    let pos = doc.full_position();
    assert_eq!(pos.start.offset, 0);
    assert_eq!(pos.end.offset, 5);
    assert_eq!(pos.end.line, 2);
    assert_eq!(pos.end.column, 3);
}

#[test]
fn test_position_cover() {
    let doc = parse("one\n\ntwo\n");
    let mut pos = doc.nodes[0].position;
    pos.cover(&doc.nodes[1].position);
    assert_eq!(pos.start.offset, 0);
    assert_eq!(pos.end.offset, doc.nodes[1].position.end.offset);
}

#[test]
fn test_node_kind_labels() {
    assert_eq!(NodeKind::ThematicBreak.as_str(), "thematic_break");
    assert_eq!(NodeKind::Blockquote.to_string(), "blockquote");
    assert!(NodeKind::List.is_container());
    assert!(!NodeKind::Paragraph.is_container());
}
