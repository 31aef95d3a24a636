//! Bulk rebuild of the index from the durable content store
//!
//! Items are pulled from a `ContentSource` in batches. Each batch is
//! committed before the next one starts, and the cancellation token is
//! checked around every batch. A failing item is recorded on the status
//! and skipped; only source or commit failures abort the rebuild.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::cancellation::CancellationToken;
use super::errors::SearchResult;
use super::mutator::{IndexMutator, validate_id};
use super::types::SearchableContent;
use crate::status::StatusTracker;

pub const OP_FULL_REBUILD: &str = "FullRebuild";
pub const OP_INCREMENTAL_REBUILD: &str = "IncrementalRebuild";

/// Source of truth the index is rebuilt from
///
/// Calls run on a blocking worker thread, so implementations may do
/// synchronous I/O.
pub trait ContentSource: Send + Sync {
    /// Number of items the source will yield, used for progress reporting
    fn total(&self) -> SearchResult<usize>;

    /// Up to `limit` items starting at `offset`; empty once exhausted
    fn load_batch(&self, offset: usize, limit: usize) -> SearchResult<Vec<SearchableContent>>;
}

impl ContentSource for Vec<SearchableContent> {
    fn total(&self) -> SearchResult<usize> {
        Ok(self.len())
    }

    fn load_batch(&self, offset: usize, limit: usize) -> SearchResult<Vec<SearchableContent>> {
        Ok(self.iter().skip(offset).take(limit).cloned().collect())
    }
}

impl<T: ContentSource + ?Sized> ContentSource for Arc<T> {
    fn total(&self) -> SearchResult<usize> {
        (**self).total()
    }

    fn load_batch(&self, offset: usize, limit: usize) -> SearchResult<Vec<SearchableContent>> {
        (**self).load_batch(offset, limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebuildMode {
    /// Clear the index, then index every item
    Full,
    /// Upsert every item over the existing index
    Incremental,
}

impl RebuildMode {
    /// Mode selected by the `incremental_rebuild` setting
    #[must_use]
    pub fn from_incremental(incremental: bool) -> Self {
        if incremental {
            Self::Incremental
        } else {
            Self::Full
        }
    }

    #[must_use]
    pub fn operation_name(self) -> &'static str {
        match self {
            Self::Full => OP_FULL_REBUILD,
            Self::Incremental => OP_INCREMENTAL_REBUILD,
        }
    }
}

/// Outcome of a rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Items indexed successfully
    pub processed: usize,
    /// Items rejected or failed individually
    pub failed: usize,
    /// Items the source reported up front
    pub total: usize,
    pub batches: usize,
    /// Stopped early by the cancellation token
    pub cancelled: bool,
}

/// Rebuild the index from `source`; runs on the calling thread
pub(crate) fn run_rebuild(
    mutator: &IndexMutator,
    status: &StatusTracker,
    source: &dyn ContentSource,
    mode: RebuildMode,
    batch_size: usize,
    cancel: &CancellationToken,
) -> SearchResult<RebuildReport> {
    cancel.check()?;

    let operation = mode.operation_name();
    let total = source.total()?;
    let start = Instant::now();
    status.begin_batch(operation, total);
    tracing::info!(operation, total, batch_size, "Rebuild started");

    let result = rebuild_batches(mutator, status, source, mode, batch_size.max(1), total, cancel);
    match &result {
        Ok(report) => {
            tracing::info!(
                operation,
                processed = report.processed,
                failed = report.failed,
                batches = report.batches,
                cancelled = report.cancelled,
                duration_ms = start.elapsed().as_millis() as u64,
                "Rebuild finished"
            );
            status.complete();
        }
        Err(e) => {
            tracing::error!(operation, error = %e, "Rebuild aborted");
            status.fail(format!("{operation} failed: {e}"));
        }
    }
    result
}

fn rebuild_batches(
    mutator: &IndexMutator,
    status: &StatusTracker,
    source: &dyn ContentSource,
    mode: RebuildMode,
    batch_size: usize,
    total: usize,
    cancel: &CancellationToken,
) -> SearchResult<RebuildReport> {
    let mut report = RebuildReport {
        total,
        ..Default::default()
    };

    if mode == RebuildMode::Full {
        mutator.clear_and_commit()?;
    }

    let mut offset = 0;
    loop {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let batch = source.load_batch(offset, batch_size)?;
        if batch.is_empty() {
            break;
        }
        let batch_len = batch.len();

        let mut last_id = None;
        for content in &batch {
            match validate_id(&content.id).and_then(|_| mutator.upsert(content)) {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(id = %content.id, error = %e, "Skipping item during rebuild");
                    status.record_error(format!("Failed to index {}: {e}", content.id));
                }
            }
            last_id = Some(content.id.as_str());
        }

        mutator.commit()?;
        report.batches += 1;
        offset += batch_len;
        status.report_progress(offset, total.max(offset), last_id);
        tracing::debug!(batch = report.batches, offset, total, "Rebuild batch committed");

        if batch_len < batch_size {
            break;
        }
    }

    Ok(report)
}
