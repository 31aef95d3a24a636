//! End-to-end behavior of the media search service over a real index

mod common;

use std::collections::HashMap;

use anyhow::Result;
use media_index::search::stats::stat_keys;
use media_index::{
    CancellationToken, MediaSearchService, ProcessingState, SearchFilters, SearchableContent,
};
use tempfile::TempDir;

use common::{content, courtroom, ids, index_all, open_service, test_config};

#[tokio::test]
async fn courtroom_scenario() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();
    index_all(&service, courtroom()).await;

    let hits = service
        .search("Statement", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(ids(&hits), vec!["doc1"]);

    let mut filter_map = HashMap::new();
    filter_map.insert("duration_min_seconds".to_string(), "200".to_string());
    let hits = service
        .search_with_filter_map("", &filter_map, None, 0, &cancel)
        .await;
    assert_eq!(ids(&hits), vec!["doc2"]);

    assert!(service.delete("doc1", &cancel).await);
    let hits = service
        .search("", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(ids(&hits), vec!["doc2"]);
    Ok(())
}

#[tokio::test]
async fn indexed_content_round_trips_through_search() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();

    let mut original = content("rt-1", "Closing Argument", "Counsel Reyes", 905.5);
    original.topics = vec!["closing".to_string(), "jury instructions".to_string()];
    original.metadata.keywords = vec!["verdict".to_string(), "burden of proof".to_string()];
    index_all(&service, vec![original.clone()]).await;

    let hits = service
        .search("*", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(hits.len(), 1);

    let found = &hits[0];
    assert!(found.score.is_some(), "results carry a relevance score");
    let mut without_score = found.clone();
    without_score.score = None;
    assert_eq!(without_score, original);
    Ok(())
}

#[tokio::test]
async fn reindexing_an_id_replaces_the_document() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();

    index_all(&service, vec![content("doc1", "First Title", "A", 10.0)]).await;
    index_all(&service, vec![content("doc1", "Second Title", "A", 10.0)]).await;

    let hits = service
        .search("", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Second Title");

    let stale = service
        .search("First", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert!(stale.is_empty());
    Ok(())
}

#[tokio::test]
async fn id_matching_ignores_case() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();

    index_all(&service, vec![content("Doc-7", "Mixed Case", "A", 10.0)]).await;
    index_all(&service, vec![content("doc-7", "Lower Case", "A", 10.0)]).await;

    let hits = service
        .search("", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Lower Case");

    assert!(service.delete("DOC-7", &cancel).await);
    let hits = service
        .search("", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert!(hits.is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_is_idempotent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();

    assert!(service.delete("never-indexed", &cancel).await);
    assert_eq!(service.status().state, ProcessingState::Idle);

    index_all(&service, courtroom()).await;
    assert!(service.delete("doc2", &cancel).await);
    assert!(service.delete("doc2", &cancel).await);

    let hits = service
        .search("Examination", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert!(hits.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_query_returns_a_page_of_everything() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = media_index::IndexConfig::builder()
        .index_dir(temp_dir.path().join("index"))
        .writer_memory_bytes(15_000_000)
        .default_page_size(2)
        .build()?;
    let service = MediaSearchService::open(config).await?;
    let cancel = CancellationToken::new();

    index_all(
        &service,
        vec![
            content("a", "Alpha", "A", 1.0),
            content("b", "Beta", "B", 2.0),
            content("c", "Gamma", "C", 3.0),
        ],
    )
    .await;

    let page = service
        .search_page("", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(page.results.len(), 2, "bounded by the default page size");
    assert_eq!(page.total_count, 3);
    assert_eq!(page.next_skip(), Some(2));

    let rest = service
        .search("", &SearchFilters::default(), Some(2), 2, &cancel)
        .await;
    assert_eq!(rest.len(), 1);

    let beyond = service
        .search("", &SearchFilters::default(), Some(5), 10, &cancel)
        .await;
    assert!(beyond.is_empty());

    let zero = service
        .search("", &SearchFilters::default(), Some(0), 0, &cancel)
        .await;
    assert!(zero.is_empty());
    Ok(())
}

#[tokio::test]
async fn pages_do_not_overlap() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();

    let items: Vec<SearchableContent> = (0..7)
        .map(|i| content(&format!("item{i}"), "Session", "A", f64::from(i)))
        .collect();
    index_all(&service, items).await;

    let mut seen = Vec::new();
    for skip in (0..7).step_by(3) {
        let page = service
            .search("session", &SearchFilters::default(), Some(3), skip, &cancel)
            .await;
        seen.extend(page.into_iter().map(|c| c.id));
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 7);
    Ok(())
}

#[tokio::test]
async fn skip_past_the_end_returns_an_empty_page() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();
    index_all(&service, courtroom()).await;

    let page = service
        .search_page("", &SearchFilters::default(), Some(20), 10_000_000_000_000, &cancel)
        .await;
    assert!(page.results.is_empty());
    assert_eq!(page.skip, 10_000_000_000_000);

    let page = service
        .search_page("", &SearchFilters::default(), Some(usize::MAX), 1, &cancel)
        .await;
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.total_count, 2);

    // The service keeps answering after oversized requests
    let hits = service
        .search("Statement", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(ids(&hits), vec!["doc1"]);
    Ok(())
}

#[tokio::test]
async fn malformed_query_falls_back_to_title_terms() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();
    index_all(&service, courtroom()).await;

    // No field called Missing, so the parser rejects it
    let hits = service
        .search("Missing:Opening", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(ids(&hits), vec!["doc1"]);

    let hits = service
        .search(
            "Missing:EXAMINATION",
            &SearchFilters::new().speakers(["B"]),
            None,
            0,
            &cancel,
        )
        .await;
    assert_eq!(ids(&hits), vec!["doc2"]);
    Ok(())
}

#[tokio::test]
async fn malformed_query_degrades_to_empty_results() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();
    index_all(&service, courtroom()).await;

    let hits = service
        .search("Bogus:x", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert!(hits.is_empty());
    assert_ne!(service.status().state, ProcessingState::Error);
    Ok(())
}

#[tokio::test]
async fn search_on_a_new_index_is_empty() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let hits = service
        .search(
            "anything",
            &SearchFilters::default(),
            None,
            0,
            &CancellationToken::new(),
        )
        .await;
    assert!(hits.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_id_is_rejected_without_status_change() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();
    let mut rx = service.subscribe();

    assert!(
        !service
            .index_or_update("  ", content("x", "Title", "A", 1.0), &cancel)
            .await
    );
    assert!(!service.delete("", &cancel).await);

    assert!(rx.try_recv().is_err(), "rejected arguments broadcast nothing");
    assert_eq!(service.status().state, ProcessingState::Idle);
    Ok(())
}

#[tokio::test]
async fn target_id_overrides_content_id() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();

    assert!(
        service
            .index_or_update("target", content("other", "Title", "A", 1.0), &cancel)
            .await
    );
    let hits = service
        .search("", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(ids(&hits), vec!["target"]);
    Ok(())
}

#[tokio::test]
async fn statistics_see_uncommitted_writes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();
    index_all(&service, courtroom()).await;

    let stats = service.get_statistics(&cancel).await;
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.status.state, ProcessingState::Idle);
    assert_eq!(
        stats.additional.get(stat_keys::CURRENT_OPERATION).map(String::as_str),
        Some("Idle")
    );
    assert!(stats.additional.contains_key(stat_keys::NUM_SEGMENTS));
    assert!(stats.additional.contains_key(stat_keys::INDEX_DIR));
    assert!(!stats.additional.contains_key("error"));
    Ok(())
}

#[tokio::test]
async fn facets_count_exact_values() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();

    let mut third = content("doc3", "Redirect", "Judge Lee", 60.0);
    third.metadata.media_type = Some("Audio".to_string());
    let mut items = courtroom();
    items.push(third);
    index_all(&service, items).await;

    let speakers = service.get_facets("Speakers", &cancel).await;
    assert_eq!(speakers.get("a"), Some(&1));
    assert_eq!(speakers.get("b"), Some(&1));
    assert_eq!(speakers.get("judge lee"), Some(&1));

    let media_types = service.get_facets("MediaType", &cancel).await;
    assert_eq!(media_types.get("video"), Some(&2));
    assert_eq!(media_types.get("audio"), Some(&1));

    assert!(service.get_facets("DurationSeconds", &cancel).await.is_empty());
    assert!(service.get_facets("NoSuchField", &cancel).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn snippets_are_pruned_by_min_confidence() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    let cancel = CancellationToken::new();

    let mut item = content("doc1", "Opening Statement", "A", 120.0);
    let mut low = item.snippets[0].clone();
    low.confidence = 0.3;
    low.text = "inaudible".to_string();
    item.snippets.push(low);
    index_all(&service, vec![item]).await;

    let filters = SearchFilters::new().min_confidence(0.5);
    let hits = service.search("", &filters, None, 0, &cancel).await;
    assert_eq!(hits.len(), 1, "min confidence never excludes documents");
    assert_eq!(hits[0].snippets.len(), 1);
    assert!(hits[0].snippets[0].confidence >= 0.5);
    Ok(())
}

#[tokio::test]
async fn cancelled_token_stops_operations_before_they_start() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;
    index_all(&service, courtroom()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(
        !service
            .index_or_update("doc9", content("doc9", "Late", "C", 1.0), &cancel)
            .await
    );
    assert!(!service.clear_all(&cancel).await);
    assert!(
        service
            .search("", &SearchFilters::default(), None, 0, &cancel)
            .await
            .is_empty()
    );

    let live = CancellationToken::new();
    let hits = service
        .search("", &SearchFilters::default(), None, 0, &live)
        .await;
    assert_eq!(ids(&hits), vec!["doc1", "doc2"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_persists_writes_and_blocks_mutations() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cancel = CancellationToken::new();
    {
        let service = open_service(&temp_dir).await?;
        index_all(&service, courtroom()).await;
        assert!(service.shutdown().await);

        assert!(
            !service
                .index_or_update("doc3", content("doc3", "After", "C", 1.0), &cancel)
                .await
        );
        let hits = service
            .search("", &SearchFilters::default(), None, 0, &cancel)
            .await;
        assert_eq!(hits.len(), 2, "reads keep working after shutdown");
    }

    let reopened = MediaSearchService::open(test_config(&temp_dir)?).await?;
    let hits = reopened
        .search("", &SearchFilters::default(), None, 0, &cancel)
        .await;
    assert_eq!(ids(&hits), vec!["doc1", "doc2"]);
    Ok(())
}

#[tokio::test]
async fn concurrent_writers_leave_one_document_per_id() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let service = open_service(&temp_dir).await?;

    let mut handles = Vec::new();
    for round in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let item = content("shared", &format!("Version {round}"), "A", 1.0);
            service
                .index_or_update("shared", item, &CancellationToken::new())
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await?);
    }

    let hits = service
        .search(
            "",
            &SearchFilters::default(),
            None,
            0,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(hits.len(), 1);
    assert!(hits[0].title.starts_with("Version "));
    Ok(())
}
