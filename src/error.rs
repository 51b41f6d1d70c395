use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Classification of chunking failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Chunk content exceeds the configured maximum after assembly
    ChunkTooLarge,
    /// Malformed source structure found during traversal
    ParsingFailed,
    /// Empty source or otherwise unusable input
    InvalidInput,
    /// Memory budget would be exceeded by further output
    MemoryExhausted,
    /// Contradictory strategy, rule or engine configuration
    ConfigInvalid,
}

impl ErrorKind {
    /// Whether a violation of this kind aborts a strict run.
    ///
    /// Parsing problems are attached to the best-effort chunk instead.
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorKind::ParsingFailed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ChunkTooLarge => "chunk_too_large",
            ErrorKind::ParsingFailed => "parsing_failed",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::MemoryExhausted => "memory_exhausted",
            ErrorKind::ConfigInvalid => "config_invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded constraint violation
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ChunkerError {
    pub kind: ErrorKind,
    pub message: String,
    /// Structured details, e.g. `chunk_type`, `chunk_size`, `max_size`
    pub context: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl ChunkerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn chunk_too_large(chunk_type: &str, size: usize, max: usize) -> Self {
        Self::new(
            ErrorKind::ChunkTooLarge,
            format!("{} chunk is {} chars (max: {})", chunk_type, size, max),
        )
        .with_context("chunk_type", chunk_type)
        .with_context("chunk_size", size)
        .with_context("max_size", max)
    }

    pub fn parsing_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParsingFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn memory_exhausted(used: usize, limit: usize) -> Self {
        Self::new(
            ErrorKind::MemoryExhausted,
            format!("output would use {} bytes (limit: {})", used, limit),
        )
        .with_context("used_bytes", used)
        .with_context("limit_bytes", limit)
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Summarize a run's violations into one error, keyed by the first one
    pub fn aggregate(errors: &[ChunkerError]) -> Option<Self> {
        let first = errors.first()?;
        let aggregate = Self::new(
            first.kind,
            format!(
                "{} violation(s) during chunking; first: {}",
                errors.len(),
                first.message
            ),
        )
        .with_context("error_count", errors.len());
        Some(aggregate)
    }
}

/// Append-only record of every violation seen by an engine
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    entries: Vec<ChunkerError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, error: ChunkerError) {
        self.entries.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ChunkerError>) {
        self.entries.extend(errors);
    }

    pub fn all(&self) -> &[ChunkerError] {
        &self.entries
    }

    pub fn by_kind(&self, kind: ErrorKind) -> Vec<&ChunkerError> {
        self.entries.iter().filter(|e| e.kind == kind).collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
