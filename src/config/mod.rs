mod migration;

pub use migration::{migrate, Migration, CONFIG_VERSION};

use crate::chunker::{CustomStrategy, Rule, BUILTIN_STRATEGIES, HIERARCHICAL};
use crate::error::ChunkerError;
use crate::parser::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Deepest heading level that opens a hierarchical section by default
pub const DEFAULT_MAX_DEPTH: u8 = 3;

/// How constraint violations affect a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    /// Abort on the first violation
    Strict,
    /// Recover and report an aggregate error
    #[default]
    Permissive,
    /// Recover; violations only show up in the error log
    Silent,
}

impl FromStr for ErrorHandling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ErrorHandling::Strict),
            "permissive" => Ok(ErrorHandling::Permissive),
            "silent" => Ok(ErrorHandling::Silent),
            other => Err(format!("unknown error handling mode '{}'", other)),
        }
    }
}

impl fmt::Display for ErrorHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorHandling::Strict => "strict",
            ErrorHandling::Permissive => "permissive",
            ErrorHandling::Silent => "silent",
        })
    }
}

/// Strategy selection plus strategy-specific parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    pub name: String,

    /// Deepest heading level that opens a section (hierarchical)
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,

    /// Overrides the engine-wide limit when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_size: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chunk_size: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_empty: Option<bool>,

    /// Node kinds this strategy considers; empty means all
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub include_types: BTreeSet<NodeKind>,

    /// Declarative rules for custom strategies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
}

fn default_max_depth() -> u8 {
    DEFAULT_MAX_DEPTH
}

impl StrategyConfig {
    /// Default parameters under another name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn validate(&self) -> Result<(), ChunkerError> {
        if self.name.trim().is_empty() {
            return Err(ChunkerError::config_invalid("strategy name is empty"));
        }
        if !(1..=6).contains(&self.max_depth) {
            return Err(ChunkerError::config_invalid(format!(
                "maxDepth must be between 1 and 6, got {}",
                self.max_depth
            ))
            .with_context("max_depth", self.max_depth));
        }
        if let (Some(min), Some(max)) = (self.min_chunk_size, self.max_chunk_size) {
            check_size_range(min, max)?;
        }
        if !self.rules.is_empty() {
            if BUILTIN_STRATEGIES.contains(&self.name.as_str()) {
                return Err(ChunkerError::config_invalid(format!(
                    "built-in strategy '{}' does not take rules; give the rule set its own name",
                    self.name
                ))
                .with_context("strategy", self.name.as_str()));
            }
            CustomStrategy::from_config(self)?;
        }
        Ok(())
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: HIERARCHICAL.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_chunk_size: None,
            min_chunk_size: None,
            merge_empty: None,
            include_types: BTreeSet::new(),
            rules: Vec::new(),
        }
    }
}

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkerConfig {
    #[serde(default = "current_version")]
    pub version: u32,

    #[serde(default)]
    pub chunking_strategy: StrategyConfig,

    /// Maximum chunk length in chars, 0 for unbounded
    #[serde(default)]
    pub max_chunk_size: usize,

    #[serde(default)]
    pub min_chunk_size: usize,

    /// Merge chunks below `min_chunk_size` forward
    #[serde(default)]
    pub merge_empty: bool,

    #[serde(default = "default_true")]
    pub filter_empty_chunks: bool,

    #[serde(default)]
    pub preserve_whitespace: bool,

    /// Node kinds that may ever be emitted
    #[serde(default = "all_kinds")]
    pub enabled_types: BTreeSet<NodeKind>,

    #[serde(default)]
    pub error_handling: ErrorHandling,

    /// Budget for emitted content in bytes, 0 for unbounded
    #[serde(default)]
    pub memory_limit: usize,
}

fn current_version() -> u32 {
    CONFIG_VERSION
}

fn default_true() -> bool {
    true
}

fn all_kinds() -> BTreeSet<NodeKind> {
    NodeKind::ALL.into_iter().collect()
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            chunking_strategy: StrategyConfig::default(),
            max_chunk_size: 0,
            min_chunk_size: 0,
            merge_empty: false,
            filter_empty_chunks: true,
            preserve_whitespace: false,
            enabled_types: all_kinds(),
            error_handling: ErrorHandling::default(),
            memory_limit: 0,
        }
    }
}

impl ChunkerConfig {
    /// Default configuration running the given strategy
    pub fn with_strategy(strategy: StrategyConfig) -> Self {
        Self {
            chunking_strategy: strategy,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ChunkerError> {
        self.chunking_strategy.validate()?;
        check_size_range(self.min_chunk_size, self.max_chunk_size)?;
        if self.enabled_types.is_empty() {
            return Err(ChunkerError::config_invalid(
                "enabledTypes is empty; nothing could ever be emitted",
            ));
        }
        Ok(())
    }

    /// Load from a `.json` or `.toml` file, migrating older layouts
    pub fn load(path: &Path) -> Result<Self, ChunkerError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ChunkerError::config_invalid(format!("failed to read {}: {}", path.display(), e))
                .with_context("path", path.display().to_string())
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ChunkerError> {
        let value: serde_json::Value = toml::from_str(text)
            .map_err(|e| ChunkerError::config_invalid(format!("invalid TOML: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ChunkerError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| ChunkerError::config_invalid(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    fn from_value(value: serde_json::Value) -> Result<Self, ChunkerError> {
        let migration = migrate(value)?;
        for note in &migration.notes {
            info!("config: {}", note);
        }
        for warning in &migration.warnings {
            warn!("config: {}", warning);
        }
        Ok(migration.config)
    }
}

fn check_size_range(min: usize, max: usize) -> Result<(), ChunkerError> {
    if max > 0 && min > max {
        return Err(ChunkerError::config_invalid(format!(
            "minChunkSize ({}) exceeds maxChunkSize ({})",
            min, max
        ))
        .with_context("min_size", min)
        .with_context("max_size", max));
    }
    Ok(())
}
