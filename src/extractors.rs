//! Metadata extractors run against every finalized chunk

use crate::chunker::{Chunk, ImageRef, LinkRef};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};
use std::collections::{BTreeMap, BTreeSet};

/// What an extractor contributes to a chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub metadata: BTreeMap<String, String>,
    pub links: Vec<LinkRef>,
    pub images: Vec<ImageRef>,
}

/// Decorates finalized chunks with auxiliary data
///
/// Extractors see the chunk read-only; the assembler merges the returned
/// [`Extraction`] into it.
pub trait MetadataExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, chunk: &Chunk) -> Extraction;
}

fn events(content: &str) -> CmarkParser<'_> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    CmarkParser::new_ext(content, options)
}

/// Collects inline and reference links
#[derive(Debug, Default)]
pub struct LinkExtractor;

impl MetadataExtractor for LinkExtractor {
    fn name(&self) -> &str {
        "links"
    }

    fn extract(&self, chunk: &Chunk) -> Extraction {
        let mut extraction = Extraction::default();
        // (url, text so far) for each link currently open
        let mut open: Vec<(String, String)> = Vec::new();

        for event in events(&chunk.content) {
            match event {
                Event::Start(Tag::Link { dest_url, .. }) => {
                    open.push((dest_url.to_string(), String::new()));
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, buf)) = open.last_mut() {
                        buf.push_str(&text);
                    }
                }
                Event::End(TagEnd::Link) => {
                    if let Some((url, text)) = open.pop() {
                        extraction.links.push(LinkRef { text, url });
                    }
                }
                _ => {}
            }
        }

        if !extraction.links.is_empty() {
            extraction
                .metadata
                .insert("link_count".to_string(), extraction.links.len().to_string());
        }
        extraction
    }
}

/// Collects image references and their alt text
#[derive(Debug, Default)]
pub struct ImageExtractor;

impl MetadataExtractor for ImageExtractor {
    fn name(&self) -> &str {
        "images"
    }

    fn extract(&self, chunk: &Chunk) -> Extraction {
        let mut extraction = Extraction::default();
        let mut open: Vec<(String, String)> = Vec::new();

        for event in events(&chunk.content) {
            match event {
                Event::Start(Tag::Image { dest_url, .. }) => {
                    open.push((dest_url.to_string(), String::new()));
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, buf)) = open.last_mut() {
                        buf.push_str(&text);
                    }
                }
                Event::End(TagEnd::Image) => {
                    if let Some((src, alt)) = open.pop() {
                        extraction.images.push(ImageRef { alt, src });
                    }
                }
                _ => {}
            }
        }

        if !extraction.images.is_empty() {
            extraction
                .metadata
                .insert("image_count".to_string(), extraction.images.len().to_string());
        }
        extraction
    }
}

/// Scores a code block given its body and optional language tag
pub type ComplexityScorer = Box<dyn Fn(&str, Option<&str>) -> f64 + Send + Sync>;

/// Summarizes code blocks: count, languages, lines
///
/// Complexity is only reported when a scorer is supplied; the highest score
/// among the chunk's blocks is recorded.
#[derive(Default)]
pub struct CodeBlockExtractor {
    scorer: Option<ComplexityScorer>,
}

impl CodeBlockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scorer(scorer: ComplexityScorer) -> Self {
        Self {
            scorer: Some(scorer),
        }
    }
}

impl MetadataExtractor for CodeBlockExtractor {
    fn name(&self) -> &str {
        "code"
    }

    fn extract(&self, chunk: &Chunk) -> Extraction {
        let mut blocks: Vec<(Option<String>, String)> = Vec::new();
        let mut current: Option<(Option<String>, String)> = None;

        for event in events(&chunk.content) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    current = Some((lang, String::new()));
                }
                Event::Text(text) => {
                    if let Some((_, body)) = current.as_mut() {
                        body.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = current.take() {
                        blocks.push(block);
                    }
                }
                _ => {}
            }
        }

        let mut extraction = Extraction::default();
        if blocks.is_empty() {
            return extraction;
        }

        let languages: BTreeSet<&str> = blocks
            .iter()
            .filter_map(|(lang, _)| lang.as_deref())
            .collect();
        let lines: usize = blocks.iter().map(|(_, body)| body.lines().count()).sum();

        let metadata = &mut extraction.metadata;
        metadata.insert("code_blocks".to_string(), blocks.len().to_string());
        metadata.insert("code_lines".to_string(), lines.to_string());
        if !languages.is_empty() {
            metadata.insert(
                "code_languages".to_string(),
                languages.into_iter().collect::<Vec<_>>().join(","),
            );
        }

        if let Some(scorer) = &self.scorer {
            let score = blocks
                .iter()
                .map(|(lang, body)| scorer(body, lang.as_deref()))
                .fold(f64::MIN, f64::max);
            metadata.insert("code_complexity".to_string(), format!("{:.2}", score));
        }
        extraction
    }
}

/// Link, image and code-block extractors
pub fn default_extractors() -> Vec<Box<dyn MetadataExtractor>> {
    vec![
        Box::new(LinkExtractor),
        Box::new(ImageExtractor),
        Box::new(CodeBlockExtractor::new()),
    ]
}
