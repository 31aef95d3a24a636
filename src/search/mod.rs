//! Media indexing and query subsystem built on Tantivy
//!
//! Content flows through the document mapper into the single index writer;
//! searches compose free text and filters into one boolean query and run it
//! against a freshly committed read snapshot.

pub mod cancellation;
pub mod document;
pub mod engine;
pub mod errors;
pub mod mutator;
pub mod query;
pub mod rebuild;
pub mod runtime_helpers;
pub mod schema;
pub mod service;
pub mod stats;
pub mod types;

pub use cancellation::CancellationToken;
pub use document::{from_document, from_ticks, to_document, to_ticks};
pub use engine::MediaIndexEngine;
pub use errors::{RetryConfig, SearchError, SearchResult};
pub use mutator::IndexMutator;
pub use query::{BuiltQuery, SearchFilters, SearchPage, TextClause, build_query};
pub use rebuild::{ContentSource, RebuildMode, RebuildReport};
pub use runtime_helpers::retry_task;
pub use schema::{MediaSchema, SchemaError, fields};
pub use service::MediaSearchService;
pub use stats::IndexStatistics;
pub use types::{
    ContentMetadata, MediaDescriptor, SearchableContent, TranscriptSnippet, TranscriptionResult,
};
