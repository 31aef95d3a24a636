//! Indexing and query subsystem for media assets
//!
//! Transcripts, metadata and derived annotations are indexed into a Tantivy
//! store and served back through free-text and filtered queries. Long index
//! operations report progress through a broadcast processing status.

pub mod config;
pub mod search;
pub mod status;

pub use config::{ConfigError, IndexConfig};
pub use search::{
    CancellationToken, ContentSource, IndexStatistics, MediaSearchService, RebuildMode,
    RebuildReport, SearchFilters, SearchPage, SearchableContent, TranscriptionResult,
};
pub use status::{ProcessingState, ProcessingStatus};
