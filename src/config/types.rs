//! Core configuration types for the media index
//!
//! `IndexConfig` is a read-only input to the indexing subsystem. Loading it
//! from files or settings stores is the caller's concern.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of results returned when a caller does not specify a limit
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default number of items per batch during a bulk rebuild
pub const DEFAULT_REBUILD_BATCH_SIZE: usize = 100;

/// Default overall memory budget for the index writer (50MB)
pub const DEFAULT_WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Minimum memory budget tantivy accepts for a single indexing thread
pub const MIN_WRITER_MEMORY_BYTES: usize = 15_000_000;

/// Default buffer size of the processing-status broadcast channel
pub const DEFAULT_STATUS_CHANNEL_CAPACITY: usize = 256;

/// Main configuration struct for the media index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the index segments.
    ///
    /// **INVARIANT:** Always an absolute path (normalized in builder).
    pub(crate) index_dir: PathBuf,
    pub(crate) default_page_size: usize,
    pub(crate) rebuild_batch_size: usize,

    /// Run a rebuild from the configured content source while opening
    pub(crate) build_on_startup: bool,

    /// Upsert-only rebuilds when true, clear-then-reindex when false
    pub(crate) incremental_rebuild: bool,

    pub(crate) writer_memory_bytes: usize,
    pub(crate) status_channel_capacity: usize,
}

/// Validation failures raised by `IndexConfigBuilder::build`
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("writer memory budget {given} bytes is below the {minimum} byte minimum")]
    WriterMemoryTooSmall { given: usize, minimum: usize },

    #[error("index_dir is required")]
    MissingIndexDir,

    #[error("Failed to resolve index directory: {0}")]
    Io(#[from] std::io::Error),
}
