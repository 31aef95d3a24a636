//! Index statistics and term-frequency facets

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use super::engine::MediaIndexEngine;
use super::errors::SearchResult;
use crate::status::ProcessingStatus;

/// Keys of `IndexStatistics::additional`
pub mod stat_keys {
    pub const CURRENT_OPERATION: &str = "current_operation";
    pub const NUM_SEGMENTS: &str = "num_segments";
    pub const INDEX_DIR: &str = "index_dir";
    pub const INDEX_SIZE_BYTES: &str = "index_size_bytes";
    pub const LAST_COMMIT: &str = "last_commit";
}

/// Read-only view of the index for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub total_documents: u64,
    pub status: ProcessingStatus,
    pub additional: BTreeMap<String, String>,
}

/// Commit, then describe the fresh snapshot
pub(crate) fn collect_statistics(
    engine: &MediaIndexEngine,
    status: ProcessingStatus,
) -> SearchResult<IndexStatistics> {
    engine.commit()?;
    let searcher = engine.searcher();

    let mut additional = BTreeMap::new();
    additional.insert(
        stat_keys::CURRENT_OPERATION.to_string(),
        status.current_operation.clone(),
    );
    additional.insert(
        stat_keys::NUM_SEGMENTS.to_string(),
        searcher.segment_readers().len().to_string(),
    );
    additional.insert(
        stat_keys::INDEX_DIR.to_string(),
        engine.index_path().display().to_string(),
    );
    if let Some(size) = engine.index_size_bytes() {
        additional.insert(stat_keys::INDEX_SIZE_BYTES.to_string(), size.to_string());
    }
    if let Some(last_commit) = engine.last_commit_time() {
        additional.insert(stat_keys::LAST_COMMIT.to_string(), last_commit.to_rfc3339());
    }

    Ok(IndexStatistics {
        total_documents: searcher.num_docs(),
        status,
        additional,
    })
}

/// Term to document-frequency table for one field
///
/// This is an approximation, not a per-document facet count. Frequencies
/// come from the term dictionary, so documents deleted but not yet merged
/// away still count. For analyzed fields the keys are the indexed tokens
/// (lower-cased, stemmed words) rather than original values; `Speakers`,
/// `Keywords` and `Topics` read their exact companions so each key is a
/// whole lower-cased value. Numeric, stored-only or unknown fields yield an
/// empty table.
pub(crate) fn collect_facets(
    engine: &MediaIndexEngine,
    field_name: &str,
) -> SearchResult<BTreeMap<String, u64>> {
    let Some(field) = engine.schema().facet_field(field_name) else {
        tracing::warn!(field = %field_name, "Facets requested for a field without a term dictionary");
        return Ok(BTreeMap::new());
    };

    engine.commit()?;
    let searcher = engine.searcher();

    let mut counts: AHashMap<String, u64> = AHashMap::new();
    for segment_reader in searcher.segment_readers() {
        let inverted_index = segment_reader.inverted_index(field)?;
        let mut terms = inverted_index.terms().stream()?;
        while terms.advance() {
            match std::str::from_utf8(terms.key()) {
                Ok(term) => {
                    *counts.entry(term.to_string()).or_insert(0) += u64::from(terms.value().doc_freq);
                }
                Err(_) => tracing::trace!(field = %field_name, "Skipping non UTF-8 term"),
            }
        }
    }

    Ok(counts.into_iter().collect())
}
