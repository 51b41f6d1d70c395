use super::{ChunkerConfig, ErrorHandling};
use crate::chunker::{BUILTIN_STRATEGIES, DOCUMENT_LEVEL, ELEMENT_LEVEL, HIERARCHICAL};
use crate::error::ChunkerError;
use crate::parser::NodeKind;
use serde_json::{Map, Value};

/// Layout version written by this crate
pub const CONFIG_VERSION: u32 = 2;

/// Keys that only exist in the version-1 layout
const LEGACY_KEYS: [&str; 9] = [
    "strategy",
    "headingDepth",
    "chunkSize",
    "minSize",
    "skipEmpty",
    "keepWhitespace",
    "types",
    "strict",
    "ignoreErrors",
];

/// Outcome of translating a configuration value
#[derive(Debug, Clone)]
pub struct Migration {
    pub config: ChunkerConfig,
    /// Whether any translation took place
    pub migrated: bool,
    pub from_version: u32,
    /// What was changed
    pub notes: Vec<String>,
    /// Options that were dropped or adjusted
    pub warnings: Vec<String>,
}

/// Translate a configuration value of any known version into the current layout
pub fn migrate(value: Value) -> Result<Migration, ChunkerError> {
    let Value::Object(map) = value else {
        return Err(ChunkerError::config_invalid(
            "configuration must be a table/object",
        ));
    };

    let version = match map.get("version").and_then(Value::as_u64) {
        Some(v) => v,
        None if LEGACY_KEYS.iter().any(|k| map.contains_key(*k)) => 1,
        None => CONFIG_VERSION as u64,
    };

    match version {
        1 => Ok(migrate_v1(map)),
        v if v == CONFIG_VERSION as u64 => {
            let config: ChunkerConfig = serde_json::from_value(Value::Object(map))
                .map_err(|e| ChunkerError::config_invalid(format!("invalid configuration: {}", e)))?;
            Ok(Migration {
                config,
                migrated: false,
                from_version: CONFIG_VERSION,
                notes: Vec::new(),
                warnings: Vec::new(),
            })
        }
        other => Err(
            ChunkerError::config_invalid(format!("unsupported configuration version {}", other))
                .with_context("version", other),
        ),
    }
}

fn migrate_v1(map: Map<String, Value>) -> Migration {
    let mut config = ChunkerConfig::default();
    let mut notes = vec![format!(
        "migrated configuration from version 1 to {}",
        CONFIG_VERSION
    )];
    let mut warnings = Vec::new();
    let mut strict = None;
    let mut ignore_errors = None;

    for (key, value) in map {
        match key.as_str() {
            "version" => {}
            "strategy" => match value.as_str() {
                Some(name) => {
                    let renamed = legacy_strategy_name(name);
                    if renamed != name {
                        notes.push(format!("renamed strategy '{}' to '{}'", name, renamed));
                    } else if !BUILTIN_STRATEGIES.contains(&name) {
                        warnings.push(format!(
                            "strategy '{}' is not built in and must be registered",
                            name
                        ));
                    }
                    config.chunking_strategy.name = renamed.to_string();
                }
                None => warnings.push("ignored non-string 'strategy'".to_string()),
            },
            "headingDepth" => match value.as_u64() {
                Some(depth) => {
                    let clamped = depth.clamp(1, 6) as u8;
                    if clamped as u64 != depth {
                        warnings.push(format!("headingDepth {} clamped to {}", depth, clamped));
                    }
                    config.chunking_strategy.max_depth = clamped;
                }
                None => warnings.push("ignored non-numeric 'headingDepth'".to_string()),
            },
            "chunkSize" => match value.as_u64() {
                Some(size) => config.max_chunk_size = size as usize,
                None => warnings.push("ignored non-numeric 'chunkSize'".to_string()),
            },
            "minSize" => match value.as_u64() {
                Some(size) => {
                    config.min_chunk_size = size as usize;
                    if size > 0 {
                        config.merge_empty = true;
                        notes.push("minSize now requires mergeEmpty; enabled it".to_string());
                    }
                }
                None => warnings.push("ignored non-numeric 'minSize'".to_string()),
            },
            "skipEmpty" => match value.as_bool() {
                Some(skip) => config.filter_empty_chunks = skip,
                None => warnings.push("ignored non-boolean 'skipEmpty'".to_string()),
            },
            "keepWhitespace" => match value.as_bool() {
                Some(keep) => config.preserve_whitespace = keep,
                None => warnings.push("ignored non-boolean 'keepWhitespace'".to_string()),
            },
            "types" => {
                let names = value.as_array().cloned().unwrap_or_default();
                let kinds: Vec<NodeKind> = names
                    .iter()
                    .filter_map(|v| {
                        let name = v.as_str()?;
                        let kind = legacy_kind(name);
                        if kind.is_none() {
                            warnings.push(format!("dropped unknown type '{}'", name));
                        }
                        kind
                    })
                    .collect();
                if kinds.is_empty() {
                    warnings.push("'types' selected nothing; keeping all types".to_string());
                } else {
                    config.enabled_types = kinds.into_iter().collect();
                }
            }
            "strict" => strict = value.as_bool(),
            "ignoreErrors" => ignore_errors = value.as_bool(),
            other => warnings.push(format!("ignored unknown option '{}'", other)),
        }
    }

    config.error_handling = match (strict, ignore_errors) {
        (Some(true), Some(true)) => {
            warnings.push("both 'strict' and 'ignoreErrors' set; using strict".to_string());
            ErrorHandling::Strict
        }
        (Some(true), _) => ErrorHandling::Strict,
        (_, Some(true)) => ErrorHandling::Silent,
        _ => ErrorHandling::Permissive,
    };

    Migration {
        config,
        migrated: true,
        from_version: 1,
        notes,
        warnings,
    }
}

fn legacy_strategy_name(name: &str) -> &str {
    match name {
        "by-heading" | "heading" | "sections" => HIERARCHICAL,
        "whole" | "single" | "document" => DOCUMENT_LEVEL,
        "per-element" | "element" | "elements" => ELEMENT_LEVEL,
        other => other,
    }
}

fn legacy_kind(name: &str) -> Option<NodeKind> {
    match name {
        "hr" | "rule" => Some(NodeKind::ThematicBreak),
        "quote" => Some(NodeKind::Blockquote),
        "codeblock" | "code_block" => Some(NodeKind::Code),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_current_version_is_untouched() {
        let migration = migrate(json!({
            "version": 2,
            "chunkingStrategy": { "name": "element-level" },
            "maxChunkSize": 300
        }))
        .unwrap();

        assert!(!migration.migrated);
        assert_eq!(migration.from_version, CONFIG_VERSION);
        assert_eq!(migration.config.max_chunk_size, 300);
        assert!(migration.notes.is_empty());
    }

    #[test]
    fn test_unversioned_current_layout() {
        let migration = migrate(json!({ "mergeEmpty": true })).unwrap();
        assert!(!migration.migrated);
        assert!(migration.config.merge_empty);
    }

    #[test]
    fn test_v1_translation() {
        let migration = migrate(json!({
            "version": 1,
            "strategy": "by-heading",
            "headingDepth": 2,
            "chunkSize": 1000,
            "minSize": 50,
            "skipEmpty": false,
            "types": ["heading", "paragraph", "hr"],
            "strict": true
        }))
        .unwrap();

        assert!(migration.migrated);
        assert_eq!(migration.from_version, 1);

        let config = migration.config;
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.chunking_strategy.name, HIERARCHICAL);
        assert_eq!(config.chunking_strategy.max_depth, 2);
        assert_eq!(config.max_chunk_size, 1000);
        assert_eq!(config.min_chunk_size, 50);
        assert!(config.merge_empty);
        assert!(!config.filter_empty_chunks);
        assert!(config.enabled_types.contains(&NodeKind::ThematicBreak));
        assert_eq!(config.enabled_types.len(), 3);
        assert_eq!(config.error_handling, ErrorHandling::Strict);
        assert!(migration
            .notes
            .iter()
            .any(|n| n.contains("'by-heading' to 'hierarchical'")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_v1_detected_without_version() {
        let migration = migrate(json!({ "strategy": "whole", "ignoreErrors": true })).unwrap();
        assert!(migration.migrated);
        assert_eq!(migration.config.chunking_strategy.name, DOCUMENT_LEVEL);
        assert_eq!(migration.config.error_handling, ErrorHandling::Silent);
    }

    #[test]
    fn test_v1_warnings() {
        let migration = migrate(json!({
            "version": 1,
            "headingDepth": 9,
            "types": ["paragraph", "widget"],
            "colour": "blue",
            "strict": true,
            "ignoreErrors": true
        }))
        .unwrap();

        assert_eq!(migration.config.chunking_strategy.max_depth, 6);
        assert_eq!(migration.config.error_handling, ErrorHandling::Strict);
        assert_eq!(migration.warnings.len(), 4);
    }

    #[test]
    fn test_rejects_unknown_version_and_non_objects() {
        assert!(migrate(json!({ "version": 7 })).is_err());
        assert!(migrate(json!([1, 2, 3])).is_err());
    }
}
