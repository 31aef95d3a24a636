//! Command-line access to a media index
//!
//! Every command opens the index, runs one operation, prints the result as
//! JSON on stdout and shuts the index down. Logs go to stderr and honor
//! `RUST_LOG`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use media_index::search::{MediaDescriptor, TranscriptionResult};
use media_index::{
    CancellationToken, IndexConfig, MediaSearchService, RebuildMode, SearchableContent,
};

#[derive(Parser)]
#[command(name = "media-index")]
#[command(about = "Index and query media transcripts and metadata")]
#[command(version)]
struct Cli {
    /// Directory holding the index
    #[arg(long, global = true, default_value = "media-index")]
    index_dir: PathBuf,

    /// Results per page when --limit is not given
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Items per committed batch during rebuilds
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Index writer memory budget in megabytes
    #[arg(long, global = true)]
    writer_memory_mb: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add or replace every content record in a JSON-lines file
    Index {
        /// One SearchableContent JSON object per line
        jsonl: PathBuf,
    },

    /// Index a transcription result together with its media descriptor
    Transcript {
        /// MediaDescriptor JSON file
        #[arg(long)]
        media: PathBuf,

        /// TranscriptionResult JSON file
        #[arg(long)]
        transcription: PathBuf,
    },

    /// Delete the document stored under an id
    Delete { id: String },

    /// Remove every document
    Clear,

    /// Search by free text and filters
    Search {
        /// Free text; omit or use "*" to match everything
        text: Option<String>,

        /// Filter as key=value, e.g. speakers=A,B or duration_min_seconds=200
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, default_value_t = 0)]
        skip: usize,
    },

    /// Document count and processing status
    Stats,

    /// Approximate term frequencies for one field
    Facets { field: String },

    /// Rebuild the index from a JSON-lines file
    Rebuild {
        jsonl: PathBuf,

        /// Clear the index before reindexing
        #[arg(long)]
        full: bool,
    },
}

#[derive(Serialize)]
struct Outcome<'a> {
    operation: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let service = MediaSearchService::open(config).await?;
    let cancel = CancellationToken::new();

    let outcome = run(&service, cli.command, &cancel).await;
    if !service.shutdown().await {
        tracing::warn!("Index did not shut down cleanly");
    }
    outcome
}

fn build_config(cli: &Cli) -> Result<IndexConfig> {
    let mut builder = IndexConfig::builder().index_dir(cli.index_dir.clone());
    if let Some(page_size) = cli.page_size {
        builder = builder.default_page_size(page_size);
    }
    if let Some(batch_size) = cli.batch_size {
        builder = builder.rebuild_batch_size(batch_size);
    }
    if let Some(megabytes) = cli.writer_memory_mb {
        builder = builder.writer_memory_bytes(megabytes.saturating_mul(1_000_000));
    }
    Ok(builder.build()?)
}

async fn run(service: &MediaSearchService, command: Commands, cancel: &CancellationToken) -> Result<()> {
    match command {
        Commands::Index { jsonl } => {
            let records = read_jsonl(&jsonl)?;
            let mut indexed = 0;
            for content in records {
                let id = content.id.clone();
                if service.index_or_update(&id, content, cancel).await {
                    indexed += 1;
                }
            }
            service.commit(cancel).await;
            print_json(&Outcome {
                operation: "index",
                success: true,
                count: Some(indexed),
            })
        }
        Commands::Transcript {
            media,
            transcription,
        } => {
            let media: MediaDescriptor = read_json(&media)?;
            let transcription: TranscriptionResult = read_json(&transcription)?;
            let content = SearchableContent::from_transcription(media, transcription);
            let id = content.id.clone();
            let success = service.index_or_update(&id, content, cancel).await
                && service.commit(cancel).await;
            print_json(&Outcome {
                operation: "transcript",
                success,
                count: None,
            })
        }
        Commands::Delete { id } => {
            let success = service.delete(&id, cancel).await && service.commit(cancel).await;
            print_json(&Outcome {
                operation: "delete",
                success,
                count: None,
            })
        }
        Commands::Clear => {
            let success = service.clear_all(cancel).await;
            print_json(&Outcome {
                operation: "clear",
                success,
                count: None,
            })
        }
        Commands::Search {
            text,
            filters,
            limit,
            skip,
        } => {
            let filter_map = parse_filters(&filters)?;
            let text = text.unwrap_or_default();
            let results = service
                .search_with_filter_map(&text, &filter_map, limit, skip, cancel)
                .await;
            print_json(&results)
        }
        Commands::Stats => print_json(&service.get_statistics(cancel).await),
        Commands::Facets { field } => print_json(&service.get_facets(&field, cancel).await),
        Commands::Rebuild { jsonl, full } => {
            let records = read_jsonl(&jsonl)?;
            let mode = if full {
                RebuildMode::Full
            } else {
                RebuildMode::Incremental
            };
            match service.rebuild(Arc::new(records), mode, cancel).await {
                Some(report) => print_json(&report),
                None => bail!("Rebuild failed; see log output"),
            }
        }
    }
}

fn parse_filters(filters: &[String]) -> Result<HashMap<String, String>> {
    filters
        .iter()
        .map(|filter| {
            let (key, value) = filter
                .split_once('=')
                .with_context(|| format!("Filter '{filter}' is not in key=value form"))?;
            Ok((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Parse one content record per non-blank line, skipping malformed lines
fn read_jsonl(path: &Path) -> Result<Vec<SearchableContent>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut records = Vec::new();
    for (line_number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<SearchableContent>(line) {
            Ok(content) => records.push(content),
            Err(e) => tracing::warn!(
                file = %path.display(),
                line = line_number + 1,
                error = %e,
                "Skipping malformed record"
            ),
        }
    }
    Ok(records)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
