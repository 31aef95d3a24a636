use media_index::search::errors::{RetryConfig, SearchError};
use media_index::search::runtime_helpers::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn fast_retries(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        max_delay: Duration::from_millis(100),
    }
}

#[tokio::test]
async fn test_retry_task_success() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let result = retry_task(fast_retries(3), move || {
        let count = counter_clone.fetch_add(1, Ordering::SeqCst);
        async move {
            if count < 2 {
                Err(SearchError::WriterAcquisition("transient".to_string()))
            } else {
                Ok(42)
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_task_gives_up_on_permanent_errors() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let result: Result<(), _> = retry_task(fast_retries(3), move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
        async { Err(SearchError::InvalidArgument("empty id".to_string())) }
    })
    .await;

    assert!(matches!(result, Err(SearchError::InvalidArgument(_))));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_task_stops_after_max_attempts() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let result: Result<(), _> = retry_task(fast_retries(2), move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
        async { Err(SearchError::WriterAcquisition("locked".to_string())) }
    })
    .await;

    assert!(matches!(result, Err(SearchError::WriterAcquisition(_))));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}
