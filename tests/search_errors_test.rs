use media_index::search::errors::*;
use std::time::Duration;

#[test]
fn test_error_transient_detection() {
    let transient = SearchError::WriterAcquisition("test".to_string());
    assert!(transient.is_transient());
    assert!(SearchError::CommitFailed("locked".to_string()).is_transient());

    let io = SearchError::from(std::io::Error::other("disk hiccup"));
    assert!(io.is_transient());

    let permanent = SearchError::QueryParsing("invalid query".to_string());
    assert!(!permanent.is_transient());

    assert!(!SearchError::InvalidArgument("empty id".to_string()).is_transient());
    assert!(!SearchError::Cancelled.is_transient());
}

#[test]
fn test_retry_config_delays() {
    let config = RetryConfig::default();

    // Test exponential backoff
    assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
    assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
    assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));

    // Test max delay cap
    assert_eq!(config.delay_for_attempt(10), config.max_delay);
}

#[test]
fn test_error_messages_name_the_document() {
    let error = SearchError::IndexingFailed {
        doc_id: "doc1".to_string(),
        message: "encoding failed".to_string(),
    };
    let text = error.to_string();
    assert!(text.contains("doc1"));
    assert!(text.contains("encoding failed"));
}
