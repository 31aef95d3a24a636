//! Async facade over the media index
//!
//! `MediaSearchService` is constructed once at startup and cloned into every
//! caller. All index I/O runs on tokio's blocking pool. Apart from `open`,
//! no operation returns an error: failures are logged and reported as
//! `false`, an empty collection, or `None`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;

use super::cancellation::CancellationToken;
use super::engine::MediaIndexEngine;
use super::errors::{SearchError, SearchResult};
use super::mutator::IndexMutator;
use super::query::{SearchFilters, SearchPage, execute_search};
use super::rebuild::{ContentSource, RebuildMode, RebuildReport, run_rebuild};
use super::stats::{IndexStatistics, collect_facets, collect_statistics};
use super::types::SearchableContent;
use crate::config::IndexConfig;
use crate::status::{ProcessingStatus, StatusTracker};

struct ServiceInner {
    config: IndexConfig,
    engine: MediaIndexEngine,
    mutator: IndexMutator,
    status: Arc<StatusTracker>,
}

/// Shared handle to one open media index
#[derive(Clone)]
pub struct MediaSearchService {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for MediaSearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSearchService")
            .field("index_dir", self.inner.config.index_dir())
            .field("subscribers", &self.inner.status.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl MediaSearchService {
    /// Open (or create) the index described by `config`
    ///
    /// Failing to open or create the index storage is the only fatal
    /// condition in this crate.
    pub async fn open(config: IndexConfig) -> anyhow::Result<Self> {
        let engine = MediaIndexEngine::create(&config)
            .await
            .with_context(|| format!("Failed to open media index at {:?}", config.index_dir()))?;
        let status = Arc::new(StatusTracker::new(config.status_channel_capacity()));
        let mutator = IndexMutator::new(engine.clone(), Arc::clone(&status));

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                engine,
                mutator,
                status,
            }),
        })
    }

    /// Open the index, then rebuild from `source` when `build_on_startup` is set
    ///
    /// A failed startup rebuild is logged and leaves the index usable.
    pub async fn open_with_source(
        config: IndexConfig,
        source: Arc<dyn ContentSource>,
    ) -> anyhow::Result<Self> {
        let service = Self::open(config).await?;
        if service.inner.config.build_on_startup() {
            let mode = RebuildMode::from_incremental(service.inner.config.incremental_rebuild());
            tracing::info!(?mode, "Building index on startup");
            if service
                .rebuild(source, mode, &CancellationToken::new())
                .await
                .is_none()
            {
                tracing::warn!("Startup rebuild did not complete; serving the existing index");
            }
        }
        Ok(service)
    }

    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    /// Subscribe to status-changed notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessingStatus> {
        self.inner.status.subscribe()
    }

    /// Copy of the current processing status
    #[must_use]
    pub fn status(&self) -> ProcessingStatus {
        self.inner.status.snapshot()
    }

    /// Add `content` under `id`, replacing any document already stored there
    pub async fn index_or_update(
        &self,
        id: &str,
        content: SearchableContent,
        cancel: &CancellationToken,
    ) -> bool {
        let id = id.to_string();
        self.run_blocking("index_or_update", cancel, move |inner| {
            inner.mutator.index_or_update(&id, &content)
        })
        .await
        .is_some()
    }

    /// Remove the document stored under `id`; succeeds when none exists
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> bool {
        let id = id.to_string();
        self.run_blocking("delete", cancel, move |inner| inner.mutator.delete(&id))
            .await
            .is_some()
    }

    /// Remove every document and commit
    pub async fn clear_all(&self, cancel: &CancellationToken) -> bool {
        self.run_blocking("clear_all", cancel, |inner| inner.mutator.clear_all())
            .await
            .is_some()
    }

    /// Make pending writes visible to new read snapshots
    pub async fn commit(&self, cancel: &CancellationToken) -> bool {
        self.run_blocking("commit", cancel, |inner| inner.mutator.commit())
            .await
            .is_some()
    }

    /// Ranked results for `text` and `filters`
    ///
    /// `limit` defaults to the configured page size. Pagination fetches
    /// `skip + limit` hits and drops the first `skip`.
    pub async fn search(
        &self,
        text: &str,
        filters: &SearchFilters,
        limit: Option<usize>,
        skip: usize,
        cancel: &CancellationToken,
    ) -> Vec<SearchableContent> {
        self.search_page(text, filters, limit, skip, cancel)
            .await
            .results
    }

    /// Like [`search`](Self::search) but with the total hit count
    pub async fn search_page(
        &self,
        text: &str,
        filters: &SearchFilters,
        limit: Option<usize>,
        skip: usize,
        cancel: &CancellationToken,
    ) -> SearchPage {
        let limit = limit.unwrap_or(self.inner.config.default_page_size());
        let text = text.to_string();
        let filters = filters.clone();

        self.run_blocking("search", cancel, move |inner| {
            execute_search(&inner.engine, &text, &filters, limit, skip)
        })
        .await
        .unwrap_or_else(|| SearchPage::empty(skip, limit))
    }

    /// Search with filters given as the calling layer's string map
    pub async fn search_with_filter_map(
        &self,
        text: &str,
        filter_map: &HashMap<String, String>,
        limit: Option<usize>,
        skip: usize,
        cancel: &CancellationToken,
    ) -> Vec<SearchableContent> {
        let filters = SearchFilters::from_filter_map(filter_map);
        self.search(text, &filters, limit, skip, cancel).await
    }

    /// Document count, status snapshot and diagnostic values
    ///
    /// On failure the count is zero and `additional["error"]` holds the cause.
    pub async fn get_statistics(&self, cancel: &CancellationToken) -> IndexStatistics {
        let result = self
            .run_blocking_result("get_statistics", cancel, |inner| {
                collect_statistics(&inner.engine, inner.status.snapshot())
            })
            .await;

        match result {
            Ok(statistics) => statistics,
            Err(e) => {
                let status = self.status();
                let mut additional = BTreeMap::new();
                additional.insert("current_operation".to_string(), status.current_operation.clone());
                additional.insert("error".to_string(), e.to_string());
                IndexStatistics {
                    total_documents: 0,
                    status,
                    additional,
                }
            }
        }
    }

    /// Approximate term to document-frequency table for one field
    ///
    /// See `collect_facets` for how the approximation differs from true
    /// per-document facet counts.
    pub async fn get_facets(
        &self,
        field: &str,
        cancel: &CancellationToken,
    ) -> BTreeMap<String, u64> {
        let field = field.to_string();
        self.run_blocking("get_facets", cancel, move |inner| {
            collect_facets(&inner.engine, &field)
        })
        .await
        .unwrap_or_default()
    }

    /// Rebuild from `source`; `None` when the rebuild could not run or aborted
    pub async fn rebuild(
        &self,
        source: Arc<dyn ContentSource>,
        mode: RebuildMode,
        cancel: &CancellationToken,
    ) -> Option<RebuildReport> {
        let batch_size = self.inner.config.rebuild_batch_size();
        let token = cancel.clone();
        self.run_blocking("rebuild", cancel, move |inner| {
            run_rebuild(
                &inner.mutator,
                &inner.status,
                source.as_ref(),
                mode,
                batch_size,
                &token,
            )
        })
        .await
    }

    /// Commit pending writes and release the writer
    ///
    /// Searches keep working afterwards; mutations return `false`.
    pub async fn shutdown(&self) -> bool {
        self.run_blocking("shutdown", &CancellationToken::new(), |inner| {
            inner.engine.shutdown()
        })
        .await
        .is_some()
    }

    async fn run_blocking<T, F>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        work: F,
    ) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&ServiceInner) -> SearchResult<T> + Send + 'static,
    {
        self.run_blocking_result(operation, cancel, work).await.ok()
    }

    async fn run_blocking_result<T, F>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        work: F,
    ) -> SearchResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ServiceInner) -> SearchResult<T> + Send + 'static,
    {
        let result = match cancel.check() {
            Ok(()) => {
                let inner = Arc::clone(&self.inner);
                tokio::task::spawn_blocking(move || work(&inner))
                    .await
                    .unwrap_or_else(|e| {
                        Err(SearchError::Other(format!("{operation} task panicked: {e}")))
                    })
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            log_failure(operation, e);
        }
        result
    }
}

fn log_failure(operation: &str, error: &SearchError) {
    match error {
        SearchError::InvalidArgument(_) => {
            tracing::warn!(operation, error = %error, "Rejected invalid argument");
        }
        SearchError::Cancelled => {
            tracing::info!(operation, "Operation cancelled before it started");
        }
        _ => tracing::error!(operation, error = %error, "Index operation failed"),
    }
}
