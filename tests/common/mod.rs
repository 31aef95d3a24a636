//! Shared fixtures for the media index test suite

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use media_index::search::{ContentMetadata, TranscriptSnippet};
use media_index::{IndexConfig, MediaSearchService, SearchableContent};
use tempfile::TempDir;

/// Config for an index inside `dir` with the smallest writer budget
#[allow(dead_code)]
pub fn test_config(dir: &TempDir) -> Result<IndexConfig> {
    Ok(IndexConfig::builder()
        .index_dir(dir.path().join("index"))
        .writer_memory_bytes(15_000_000)
        .build()?)
}

/// Open a fresh service over a temporary directory
#[allow(dead_code)]
pub async fn open_service(dir: &TempDir) -> Result<MediaSearchService> {
    MediaSearchService::open(test_config(dir)?).await
}

#[allow(dead_code)]
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Content with one speaker, a creation date and a duration
#[allow(dead_code)]
pub fn content(id: &str, title: &str, speaker: &str, duration_seconds: f64) -> SearchableContent {
    SearchableContent {
        id: id.to_string(),
        file_path: Some(format!("/media/{id}.mp4")),
        file_name: Some(format!("{id}.mp4")),
        title: title.to_string(),
        description: format!("Recording {id}"),
        transcript: format!("{speaker} speaks during {title}"),
        topics: vec!["hearing".to_string()],
        metadata: ContentMetadata {
            speakers: vec![speaker.to_string()],
            keywords: Vec::new(),
            media_type: Some("Video".to_string()),
        },
        created_at: at(2024, 3, 1),
        duration_seconds,
        snippets: vec![TranscriptSnippet {
            text: format!("{title} begins"),
            start_seconds: 0.0,
            end_seconds: 4.0,
            confidence: 0.9,
            speaker: Some(speaker.to_string()),
        }],
        score: None,
    }
}

/// The two-document courtroom fixture
#[allow(dead_code)]
pub fn courtroom() -> Vec<SearchableContent> {
    vec![
        content("doc1", "Opening Statement", "A", 120.0),
        content("doc2", "Cross Examination", "B", 300.0),
    ]
}

/// Index every item and fail the test if any write is rejected
#[allow(dead_code)]
pub async fn index_all(service: &MediaSearchService, items: Vec<SearchableContent>) {
    let cancel = media_index::CancellationToken::new();
    for item in items {
        let id = item.id.clone();
        assert!(
            service.index_or_update(&id, item, &cancel).await,
            "indexing {id} should succeed"
        );
    }
}

/// Sorted ids of a result list
#[allow(dead_code)]
pub fn ids(results: &[SearchableContent]) -> Vec<String> {
    let mut ids: Vec<String> = results.iter().map(|c| c.id.clone()).collect();
    ids.sort();
    ids
}
