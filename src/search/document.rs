//! Mapping between `SearchableContent` and tantivy documents

use chrono::{DateTime, Utc};
use tantivy::{TantivyDocument, schema::Value};

use super::errors::{SearchError, SearchResult};
use super::schema::MediaSchema;
use super::types::{ContentMetadata, SearchableContent, TranscriptSnippet};

/// Ticks (100 ns units) between 0001-01-01 and the Unix epoch
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const NANOS_PER_TICK: i64 = 100;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert a timestamp into the integer tick count used for range queries
///
/// Sub-tick precision is truncated.
#[must_use]
pub fn to_ticks(timestamp: &DateTime<Utc>) -> i64 {
    let seconds = timestamp.timestamp();
    let sub_ticks = i64::from(timestamp.timestamp_subsec_nanos()) / NANOS_PER_TICK;
    seconds
        .saturating_mul(TICKS_PER_SECOND)
        .saturating_add(sub_ticks)
        .saturating_add(UNIX_EPOCH_TICKS)
}

/// Inverse of [`to_ticks`]; `None` when the value is outside chrono's range
#[must_use]
pub fn from_ticks(ticks: i64) -> Option<DateTime<Utc>> {
    let unix_ticks = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let seconds = unix_ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = unix_ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
}

/// Flatten content into a document
///
/// Multi-valued fields repeat once per value, and each filterable value is
/// written twice: analyzed for free text and exact for filters and facets.
pub fn to_document(schema: &MediaSchema, content: &SearchableContent) -> SearchResult<TantivyDocument> {
    let id = content.id.trim();
    if id.is_empty() {
        return Err(SearchError::InvalidArgument(
            "content id must not be empty".to_string(),
        ));
    }

    let mut doc = TantivyDocument::default();
    doc.add_text(schema.id, id);

    if let Some(path) = content.file_path.as_deref().filter(|p| !p.is_empty()) {
        doc.add_text(schema.file_path, path);
    }
    if let Some(name) = content.file_name.as_deref().filter(|n| !n.is_empty()) {
        doc.add_text(schema.file_name, name);
    }

    doc.add_text(schema.title, &content.title);
    doc.add_text(schema.description, &content.description);
    doc.add_text(schema.transcript, &content.transcript);

    for topic in non_blank(&content.topics) {
        doc.add_text(schema.topics, topic);
        doc.add_text(schema.topic_exact, topic.trim());
    }

    let metadata = &content.metadata;
    for keyword in non_blank(&metadata.keywords) {
        doc.add_text(schema.keywords, keyword);
        doc.add_text(schema.keyword_exact, keyword.trim());
    }
    for speaker in non_blank(&metadata.speakers) {
        doc.add_text(schema.speakers, speaker);
        doc.add_text(schema.speaker_exact, speaker.trim());
    }
    if let Some(media_type) = metadata.media_type.as_deref().map(str::trim)
        && !media_type.is_empty()
    {
        doc.add_text(schema.media_type, media_type);
    }

    doc.add_text(schema.created_at, content.created_at.to_rfc3339());
    doc.add_i64(schema.created_at_ticks, to_ticks(&content.created_at));
    doc.add_f64(schema.duration_seconds, content.duration_seconds);

    if !content.snippets.is_empty() {
        let snippets = serde_json::to_string(&content.snippets).map_err(|e| {
            SearchError::DocumentMapping(format!("snippets for {id} could not be encoded: {e}"))
        })?;
        doc.add_text(schema.snippets, snippets);
    }

    Ok(doc)
}

/// Rebuild content from a stored document
///
/// Only the id is mandatory. Absent fields come back empty, and a stored
/// snippet list that no longer decodes is dropped with a warning.
pub fn from_document(schema: &MediaSchema, doc: &TantivyDocument) -> SearchResult<SearchableContent> {
    let first = |field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string);
    let all = |field| {
        doc.get_all(field)
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect::<Vec<_>>()
    };

    let id = first(schema.id)
        .ok_or_else(|| SearchError::DocumentMapping("stored document has no Id".to_string()))?;

    let created_at = first(schema.created_at)
        .and_then(|text| DateTime::parse_from_rfc3339(&text).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            doc.get_first(schema.created_at_ticks)
                .and_then(|v| v.as_i64())
                .and_then(from_ticks)
        })
        .unwrap_or_default();

    let snippets = match first(schema.snippets) {
        Some(json) => serde_json::from_str::<Vec<TranscriptSnippet>>(&json).unwrap_or_else(|e| {
            tracing::warn!(id = %id, error = %e, "Dropping undecodable stored snippets");
            Vec::new()
        }),
        None => Vec::new(),
    };

    Ok(SearchableContent {
        file_path: first(schema.file_path),
        file_name: first(schema.file_name),
        title: first(schema.title).unwrap_or_default(),
        description: first(schema.description).unwrap_or_default(),
        transcript: first(schema.transcript).unwrap_or_default(),
        topics: all(schema.topics),
        metadata: ContentMetadata {
            speakers: all(schema.speakers),
            keywords: all(schema.keywords),
            media_type: first(schema.media_type),
        },
        created_at,
        duration_seconds: doc
            .get_first(schema.duration_seconds)
            .and_then(|v| v.as_f64())
            .unwrap_or_default(),
        snippets,
        score: None,
        id,
    })
}

/// Values as given, minus blank ones; only the exact companions are trimmed
fn non_blank(values: &[String]) -> impl Iterator<Item = &str> {
    values
        .iter()
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}
