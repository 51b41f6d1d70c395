use anyhow::{bail, Context, Result};
use clap::Parser as _;
use mdchunk::{
    Chunk, ChunkerConfig, ChunkerError, ChunkingEngine, ErrorHandling, PerformanceStats,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Split Markdown documents into chunks for indexing
#[derive(clap::Parser, Debug)]
#[command(name = "mdchunk")]
#[command(version)]
struct Cli {
    /// Markdown files or directories to chunk
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strategy name (element-level, hierarchical, document-level or a configured one)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Deepest heading level that opens a section
    #[arg(long)]
    max_depth: Option<u8>,

    /// Maximum chunk length in chars
    #[arg(long)]
    max_chunk_size: Option<usize>,

    /// Minimum chunk length in chars
    #[arg(long)]
    min_chunk_size: Option<usize>,

    /// Merge undersized chunks forward
    #[arg(long, default_value_t = false)]
    merge_empty: bool,

    /// Error handling mode: strict, permissive or silent
    #[arg(short, long)]
    errors: Option<ErrorHandling>,

    /// Pretty-print JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Serialize)]
struct FileReport<'a> {
    path: String,
    chunks: &'a [Chunk],
    errors: &'a [ChunkerError],
    stats: &'a PerformanceStats,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = build_config(&cli)?;
    let mut engine = ChunkingEngine::default().with_default_extractors();
    engine
        .configure(config)
        .context("invalid chunking configuration")?;

    let files = collect_markdown(&cli.paths);
    if files.is_empty() {
        bail!("no Markdown files found");
    }
    info!(files = files.len(), strategy = %engine.strategy().name(), "chunking");

    let mut failed = 0;
    for path in &files {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        engine.clear_errors();
        let chunks = match engine.chunk_markdown(&source) {
            Ok(output) => output.chunks,
            Err(e) => {
                warn!(path = %path.display(), "{}", e);
                failed += 1;
                Vec::new()
            }
        };

        let report = FileReport {
            path: path.display().to_string(),
            chunks: &chunks,
            errors: engine.errors(),
            stats: engine.stats(),
        };
        let json = if cli.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{}", json);
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, files.len());
    }
    Ok(())
}

/// Initialize tracing subscriber with environment filter, logging to stderr
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

/// Load the configuration file, then apply command-line overrides
fn build_config(cli: &Cli) -> Result<ChunkerConfig> {
    let mut config = match &cli.config {
        Some(path) => ChunkerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ChunkerConfig::default(),
    };

    if let Some(name) = &cli.strategy {
        config.chunking_strategy.name = name.clone();
    }
    if let Some(depth) = cli.max_depth {
        config.chunking_strategy.max_depth = depth;
    }
    if let Some(size) = cli.max_chunk_size {
        config.max_chunk_size = size;
    }
    if let Some(size) = cli.min_chunk_size {
        config.min_chunk_size = size;
    }
    if cli.merge_empty {
        config.merge_empty = true;
    }
    if let Some(mode) = cli.errors {
        config.error_handling = mode;
    }
    Ok(config)
}

/// Expand directories into the Markdown files beneath them, in path order
fn collect_markdown(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_markdown(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
}
