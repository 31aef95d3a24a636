//! Index storage, the single writer, and read snapshots
//!
//! `MediaIndexEngine` owns the tantivy index for one directory. Clones share
//! the same writer (behind one exclusive lock) and the same reader, so the
//! engine can be handed to every caller instead of living in a global.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::{Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, Searcher, Term};

use super::errors::{RetryConfig, SearchError, SearchResult};
use super::runtime_helpers::retry_task;
use super::schema::MediaSchema;
use crate::config::IndexConfig;

/// Owner of the index, its writer and its reader
#[derive(Clone)]
pub struct MediaIndexEngine {
    index: Index,
    schema: MediaSchema,
    reader: IndexReader,
    query_parser: QueryParser,
    index_path: PathBuf,
    /// `None` once the engine has been shut down
    writer: Arc<Mutex<Option<IndexWriter>>>,
    /// Set by every mutation, cleared by a successful commit
    dirty: Arc<AtomicBool>,
}

impl std::fmt::Debug for MediaIndexEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaIndexEngine")
            .field("index_path", &self.index_path)
            .field("dirty", &self.dirty.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl MediaIndexEngine {
    /// Open the index in `config.index_dir()`, creating it when absent
    ///
    /// An existing index whose schema no longer matches is discarded and
    /// recreated empty; its content is expected to come back via rebuild.
    pub async fn create(config: &IndexConfig) -> SearchResult<Self> {
        let index_dir = config.index_dir().to_path_buf();
        let schema = MediaSchema::new();

        let open_dir = index_dir.clone();
        let open_schema = schema.clone();
        let (index, schema) =
            tokio::task::spawn_blocking(move || open_or_create(&open_dir, open_schema))
                .await
                .map_err(|e| SearchError::IndexInitialization(format!("Open task panicked: {e}")))??;

        MediaSchema::register_tokenizers(index.tokenizers());

        let threads = config.writer_threads();
        let memory = config.writer_memory_bytes();
        let writer_index = index.clone();
        let writer: IndexWriter = retry_task(RetryConfig::default(), move || {
            let index = writer_index.clone();
            async move {
                index.writer_with_num_threads(threads, memory).map_err(|e| {
                    SearchError::WriterAcquisition(format!(
                        "Failed to acquire index writer with {}MB limit: {e}",
                        memory / 1_000_000
                    ))
                })
            }
        })
        .await?;

        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| {
                SearchError::IndexInitialization(format!("Failed to create index reader: {e}"))
            })?;

        let mut query_parser = QueryParser::for_index(&index, schema.text_fields());
        query_parser.set_field_boost(schema.title, 2.0);

        tracing::info!(
            index_dir = %index_dir.display(),
            writer_threads = threads,
            writer_memory_bytes = memory,
            "Media index opened"
        );

        Ok(Self {
            index,
            schema,
            reader,
            query_parser,
            index_path: index_dir,
            writer: Arc::new(Mutex::new(Some(writer))),
            dirty: Arc::new(AtomicBool::new(false)),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &MediaSchema {
        &self.schema
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[must_use]
    pub fn query_parser(&self) -> &QueryParser {
        &self.query_parser
    }

    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Snapshot of the index as of the last reload
    #[must_use]
    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    /// Term addressing every document stored under `id`
    ///
    /// Ids are exact-match values, so matching ignores case and padding.
    #[must_use]
    pub fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.schema.id, &id.trim().to_lowercase())
    }

    /// Run `apply` while holding the exclusive writer lock
    ///
    /// The lock covers the mutation call only. Changes become visible to
    /// readers after the next [`commit`](Self::commit).
    pub fn with_writer<R>(
        &self,
        apply: impl FnOnce(&mut IndexWriter) -> SearchResult<R>,
    ) -> SearchResult<R> {
        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or_else(shut_down_error)?;
        let result = apply(writer)?;
        self.dirty.store(true, Ordering::Release);
        Ok(result)
    }

    /// Make pending writes durable and visible to new snapshots
    ///
    /// Returns whether a commit was actually needed. The reader is reloaded
    /// either way, so a snapshot taken afterwards includes every mutation
    /// that completed before this call.
    pub fn commit(&self) -> SearchResult<bool> {
        let start = Instant::now();
        // Clean indexes skip the writer lock entirely
        let committed = self.dirty.load(Ordering::Acquire) && {
            let mut guard = self.writer.lock();
            if self.dirty.load(Ordering::Acquire) {
                let writer = guard.as_mut().ok_or_else(shut_down_error)?;
                writer
                    .commit()
                    .map_err(|e| SearchError::CommitFailed(format!("Index commit failed: {e}")))?;
                self.dirty.store(false, Ordering::Release);
                true
            } else {
                false
            }
        };

        self.reader
            .reload()
            .map_err(|e| SearchError::Other(format!("Failed to reload reader: {e}")))?;

        if committed {
            tracing::debug!(
                duration_ms = start.elapsed().as_millis() as u64,
                "Index commit and reload completed"
            );
        }
        Ok(committed)
    }

    /// Commit, then release the writer after its merge threads finish
    ///
    /// Mutations after shutdown fail with `WriterAcquisition`; reads keep
    /// working against the last committed state.
    pub fn shutdown(&self) -> SearchResult<()> {
        let Some(mut writer) = self.writer.lock().take() else {
            return Ok(());
        };

        if self.dirty.swap(false, Ordering::AcqRel) {
            writer
                .commit()
                .map_err(|e| SearchError::CommitFailed(format!("Final commit failed: {e}")))?;
        }
        writer.wait_merging_threads()?;
        self.reader
            .reload()
            .map_err(|e| SearchError::Other(format!("Failed to reload reader: {e}")))?;

        tracing::info!(index_dir = %self.index_path.display(), "Media index shut down");
        Ok(())
    }

    /// Modification time of `meta.json`, i.e. the last commit
    #[must_use]
    pub fn last_commit_time(&self) -> Option<DateTime<Utc>> {
        std::fs::metadata(self.index_path.join("meta.json"))
            .ok()
            .and_then(|metadata| metadata.modified().ok())
            .and_then(|modified| {
                let elapsed = modified.duration_since(SystemTime::UNIX_EPOCH).ok()?;
                DateTime::from_timestamp(i64::try_from(elapsed.as_secs()).ok()?, 0)
            })
    }

    /// Total size of the files under the index directory
    #[must_use]
    pub fn index_size_bytes(&self) -> Option<u64> {
        use jwalk::WalkDir;

        if !self.index_path.exists() {
            return None;
        }

        let cpu_count = num_cpus::get();
        let parallelism = match cpu_count {
            1..=4 => cpu_count,
            5..=8 => cpu_count - 1,
            _ => 8,
        };

        let total = WalkDir::new(&self.index_path)
            .parallelism(jwalk::Parallelism::RayonNewPool(parallelism))
            .skip_hidden(false)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| std::fs::metadata(entry.path()).ok())
            .map(|metadata| metadata.len())
            .sum();
        Some(total)
    }
}

fn shut_down_error() -> SearchError {
    SearchError::WriterAcquisition("index writer has been shut down".to_string())
}

fn create_index(index_dir: &Path, schema: &MediaSchema) -> SearchResult<Index> {
    let directory = MmapDirectory::open(index_dir).map_err(|e| {
        SearchError::IndexInitialization(format!(
            "Failed to open index directory {}: {e}",
            index_dir.display()
        ))
    })?;
    Index::create(directory, schema.schema.clone(), IndexSettings::default()).map_err(|e| {
        SearchError::IndexInitialization(format!("Failed to create index: {e}"))
    })
}

fn open_or_create(index_dir: &Path, schema: MediaSchema) -> SearchResult<(Index, MediaSchema)> {
    std::fs::create_dir_all(index_dir).map_err(|e| {
        SearchError::IndexInitialization(format!(
            "Failed to create index directory {}: {e}",
            index_dir.display()
        ))
    })?;

    if !index_dir.join("meta.json").exists() {
        let index = create_index(index_dir, &schema)?;
        tracing::info!(index_dir = %index_dir.display(), "Created new media index");
        return Ok((index, schema));
    }

    let existing = Index::open_in_dir(index_dir).map_err(|e| {
        SearchError::IndexInitialization(format!(
            "Failed to open existing index at {}: {e}",
            index_dir.display()
        ))
    })?;

    match MediaSchema::from_schema(existing.schema()) {
        Ok(existing_schema) => Ok((existing, existing_schema)),
        Err(mismatch) => {
            tracing::warn!(
                index_dir = %index_dir.display(),
                reason = %mismatch,
                "Schema mismatch detected - recreating index"
            );
            drop(existing);

            std::fs::remove_dir_all(index_dir)?;
            std::fs::create_dir_all(index_dir)?;
            let index = create_index(index_dir, &schema)?;
            Ok((index, schema))
        }
    }
}
