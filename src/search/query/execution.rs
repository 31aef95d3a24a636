//! Search query execution logic

use std::time::Instant;

use tantivy::TantivyDocument;
use tantivy::collector::{Count, TopDocs};

use super::builder::build_query;
use super::filters::SearchFilters;
use super::results::SearchPage;
use crate::search::document::from_document;
use crate::search::engine::MediaIndexEngine;
use crate::search::errors::{SearchError, SearchResult};

/// Run a search against a freshly committed snapshot
///
/// The collector fetches `skip + limit` hits, capped at the document count,
/// and the first `skip` are dropped here, so deep pages cost O(skip + limit).
/// A `skip` past the last document yields an empty page. Documents that fail
/// to map back are skipped with a warning rather than failing the page.
pub(crate) fn execute_search(
    engine: &MediaIndexEngine,
    text: &str,
    filters: &SearchFilters,
    limit: usize,
    skip: usize,
) -> SearchResult<SearchPage> {
    let start = Instant::now();
    engine.commit()?;

    if limit == 0 {
        return Ok(SearchPage::empty(skip, limit));
    }

    let searcher = engine.searcher();
    // The collector preallocates its heap, so never ask for more hits than exist
    let num_docs = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
    if skip >= num_docs {
        return Ok(SearchPage::empty(skip, limit));
    }
    let fetch = skip.saturating_add(limit).min(num_docs);
    let built = build_query(engine, text, filters);

    let (top_docs, total_count) = searcher
        .search(&*built.query, &(TopDocs::with_limit(fetch), Count))
        .map_err(|e| SearchError::SearchExecution(format!("Search failed: {e}")))?;

    let mut results = Vec::with_capacity(top_docs.len().saturating_sub(skip));
    for (score, address) in top_docs.into_iter().skip(skip) {
        let doc: TantivyDocument = searcher
            .doc(address)
            .map_err(|e| SearchError::SearchExecution(format!("Failed to load document: {e}")))?;

        match from_document(engine.schema(), &doc) {
            Ok(mut content) => {
                content.score = Some(score);
                if let Some(min_confidence) = filters.min_confidence {
                    content
                        .snippets
                        .retain(|snippet| snippet.confidence >= min_confidence);
                }
                results.push(content);
            }
            Err(e) => tracing::warn!(error = %e, "Skipping unmappable search hit"),
        }
    }

    tracing::debug!(
        query = %text,
        text_clause = ?built.text,
        filter_clauses = built.filter_clauses,
        total_count,
        returned = results.len(),
        skip,
        limit,
        duration_ms = start.elapsed().as_millis() as u64,
        "Search executed"
    );

    Ok(SearchPage {
        results,
        total_count,
        skip,
        limit,
    })
}
