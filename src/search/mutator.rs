//! Add-or-replace, delete and clear over the single index writer
//!
//! Each public mutation moves the status tracker to `Processing` before it
//! touches the writer and to `Idle` or `Error` afterwards. Status updates
//! always happen outside the writer lock.

use std::sync::Arc;
use std::time::Instant;

use super::document::to_document;
use super::engine::MediaIndexEngine;
use super::errors::{SearchError, SearchResult};
use super::types::SearchableContent;
use crate::status::StatusTracker;

pub const OP_INDEX_OR_UPDATE: &str = "IndexOrUpdate";
pub const OP_DELETE: &str = "Delete";
pub const OP_CLEAR_ALL: &str = "ClearAll";

/// Serialized write access to the index
#[derive(Debug, Clone)]
pub struct IndexMutator {
    engine: MediaIndexEngine,
    status: Arc<StatusTracker>,
}

impl IndexMutator {
    #[must_use]
    pub fn new(engine: MediaIndexEngine, status: Arc<StatusTracker>) -> Self {
        Self { engine, status }
    }

    #[must_use]
    pub fn engine(&self) -> &MediaIndexEngine {
        &self.engine
    }

    /// Replace whatever is stored under `id` with `content`
    ///
    /// `id` is authoritative: a differing `content.id` is overwritten.
    /// Invalid arguments are rejected before any status transition.
    pub fn index_or_update(&self, id: &str, content: &SearchableContent) -> SearchResult<()> {
        let id = validate_id(id)?;
        let mut content = content.clone();
        if content.id.trim() != id {
            if !content.id.trim().is_empty() {
                tracing::warn!(id = %id, content_id = %content.id, "Content id differs from target id; using target id");
            }
            content.id = id.to_string();
        }

        self.status
            .begin(OP_INDEX_OR_UPDATE, Some(id), content.file_name.as_deref());
        let result = self.upsert(&content);
        self.finish(OP_INDEX_OR_UPDATE, id, result)
    }

    /// Remove every document stored under `id`
    ///
    /// Deleting an id that was never indexed succeeds.
    pub fn delete(&self, id: &str) -> SearchResult<()> {
        let id = validate_id(id)?;
        self.status.begin(OP_DELETE, Some(id), None);
        let term = self.engine.id_term(id);
        let result = self.engine.with_writer(|writer| {
            writer.delete_term(term);
            Ok(())
        });
        self.finish(OP_DELETE, id, result)
    }

    /// Remove every document and commit
    pub fn clear_all(&self) -> SearchResult<()> {
        self.status.begin(OP_CLEAR_ALL, None, None);
        let start = Instant::now();
        let result = self.clear_and_commit();
        match &result {
            Ok(()) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Cleared media index"
                );
                self.status.complete();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to clear media index");
                self.status.fail(format!("{OP_CLEAR_ALL} failed: {e}"));
            }
        }
        result
    }

    /// Make pending writes visible to new read snapshots
    pub fn commit(&self) -> SearchResult<bool> {
        self.engine.commit()
    }

    /// Replace a document without touching the status tracker
    ///
    /// Delete-by-id and insert happen under one writer lock acquisition and
    /// become visible together at the next commit.
    pub(crate) fn upsert(&self, content: &SearchableContent) -> SearchResult<()> {
        let doc = to_document(self.engine.schema(), content)?;
        let term = self.engine.id_term(&content.id);
        self.engine.with_writer(|writer| {
            writer.delete_term(term);
            writer
                .add_document(doc)
                .map_err(|e| SearchError::IndexingFailed {
                    doc_id: content.id.clone(),
                    message: e.to_string(),
                })?;
            Ok(())
        })
    }

    /// Delete every document, including ones added since the last commit
    ///
    /// `delete_all_documents` only drops committed segments, so pending
    /// additions are committed first under the same lock.
    pub(crate) fn clear_and_commit(&self) -> SearchResult<()> {
        self.engine.with_writer(|writer| {
            writer
                .commit()
                .map_err(|e| SearchError::CommitFailed(format!("Pre-clear commit failed: {e}")))?;
            writer.delete_all_documents()?;
            Ok(())
        })?;
        self.engine.commit()?;
        Ok(())
    }

    fn finish(&self, operation: &str, id: &str, result: SearchResult<()>) -> SearchResult<()> {
        match &result {
            Ok(()) => {
                tracing::debug!(id = %id, operation, "Mutation applied");
                self.status.complete();
            }
            Err(e) => {
                tracing::error!(id = %id, operation, error = %e, "Mutation failed");
                self.status.fail(format!("{operation} failed for {id}: {e}"));
            }
        }
        result
    }
}

/// Trimmed, non-empty id or `InvalidArgument`
pub(crate) fn validate_id(id: &str) -> SearchResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(SearchError::InvalidArgument(
            "id must not be empty".to_string(),
        ));
    }
    Ok(id)
}
