//! Error types for index operations
//!
//! These errors stay inside the subsystem. Public service operations log
//! them and translate them into a boolean flag or an empty collection.

use std::time::Duration;
use tantivy::TantivyError;
use thiserror::Error;

/// Result type alias for index operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Error types for index operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Index storage could not be opened or created
    #[error("Failed to initialize media index: {0}")]
    IndexInitialization(String),

    /// Query text could not be parsed
    #[error("Invalid search query: {0}")]
    QueryParsing(String),

    /// Search execution failed
    #[error("Search execution failed: {0}")]
    SearchExecution(String),

    /// A mutation could not be applied
    #[error("Indexing failed for document {doc_id}: {message}")]
    IndexingFailed { doc_id: String, message: String },

    /// Index writer acquisition failed (transient)
    #[error("Failed to acquire index writer (retry recommended): {0}")]
    WriterAcquisition(String),

    /// Index commit failed
    #[error("Failed to commit index changes: {0}")]
    CommitFailed(String),

    /// Stored document could not be mapped back into content
    #[error("Failed to map document: {0}")]
    DocumentMapping(String),

    /// Caller supplied an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation observed its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tantivy error wrapper
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SearchError {
    /// Check if error is transient and should be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SearchError::WriterAcquisition(_)
                | SearchError::Io(_)
                | SearchError::CommitFailed(_)
                | SearchError::Tantivy(TantivyError::LockFailure(..))
        )
    }
}

/// Retry configuration for index operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: u32,
    /// Initial retry delay
    pub initial_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum retry delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Calculate delay for given attempt number (0-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (self.initial_delay.as_millis() as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}
