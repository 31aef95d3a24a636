//! Query construction and execution
//!
//! Free text is parsed across the analyzed fields with OR semantics and
//! ANDed with one OR-group per active filter category plus inclusive range
//! clauses for creation date and duration.

mod builder;
mod execution;
mod filters;
mod results;

pub use builder::{BuiltQuery, TextClause, build_query};
pub(crate) use execution::execute_search;
pub use filters::{SearchFilters, keys as filter_keys, parse_timestamp};
pub use results::SearchPage;
