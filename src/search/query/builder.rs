//! Composition of free text and filters into one tantivy query

use std::ops::Bound;

use tantivy::{
    Term,
    query::{AllQuery, BooleanQuery, Occur, Query, RangeQuery, TermQuery},
    schema::{Field, IndexRecordOption},
    tokenizer::TokenStream,
};

use super::filters::SearchFilters;
use crate::search::document::to_ticks;
use crate::search::engine::MediaIndexEngine;
use crate::search::errors::SearchError;

/// Text that means "no text constraint"
const MATCH_ALL_TOKENS: &[&str] = &["*", "*:*"];

/// How the free-text part of a query was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextClause {
    /// Empty or wildcard text
    None,
    /// Parsed across the analyzed fields
    Parsed,
    /// Parser rejected the text; exact title terms instead
    Fallback,
}

/// A composed query plus a description of how it was built
#[derive(Debug)]
pub struct BuiltQuery {
    pub query: Box<dyn Query>,
    pub text: TextClause,
    /// OR-groups and range clauses ANDed into the query
    pub filter_clauses: usize,
}

impl BuiltQuery {
    /// True when the query degenerated to "every document"
    #[must_use]
    pub fn matches_all(&self) -> bool {
        self.text == TextClause::None && self.filter_clauses == 0
    }
}

/// Build the query for `text` constrained by `filters`
///
/// Never fails: unparseable text degrades to exact title terms.
#[must_use]
pub fn build_query(engine: &MediaIndexEngine, text: &str, filters: &SearchFilters) -> BuiltQuery {
    let (text_query, text_clause) = build_text_clause(engine, text);
    let filter_clauses = if filters.has_any_filter() {
        build_filter_clauses(engine, filters)
    } else {
        Vec::new()
    };
    let filter_count = filter_clauses.len();

    let query: Box<dyn Query> = match (text_query, filter_count) {
        (None, 0) => Box::new(AllQuery),
        (Some(text_query), 0) => text_query,
        (text_query, _) => {
            // Filters only constrain, so a missing text clause becomes match-all
            let anchor = text_query.unwrap_or_else(|| Box::new(AllQuery) as Box<dyn Query>);
            let mut clauses = Vec::with_capacity(filter_count + 1);
            clauses.push((Occur::Must, anchor));
            clauses.extend(filter_clauses.into_iter().map(|clause| (Occur::Must, clause)));
            Box::new(BooleanQuery::new(clauses))
        }
    };

    BuiltQuery {
        query,
        text: text_clause,
        filter_clauses: filter_count,
    }
}

fn build_text_clause(engine: &MediaIndexEngine, text: &str) -> (Option<Box<dyn Query>>, TextClause) {
    let text = text.trim();
    if text.is_empty() || MATCH_ALL_TOKENS.contains(&text) {
        return (None, TextClause::None);
    }

    match engine.query_parser().parse_query(text) {
        Ok(query) => (Some(query), TextClause::Parsed),
        Err(e) => {
            let error = SearchError::QueryParsing(e.to_string());
            tracing::warn!(
                query = %text,
                error = %error,
                "Falling back to exact title terms"
            );
            (Some(title_terms(engine, text)), TextClause::Fallback)
        }
    }
}

/// Exact title terms for text the parser rejected
///
/// The text runs through the title's own analyzer, so `Missing:Opening`
/// becomes the terms `miss` and `open`, and any of them may match. Syntax
/// characters never reach the index.
fn title_terms(engine: &MediaIndexEngine, text: &str) -> Box<dyn Query> {
    let title = engine.schema().title;
    let mut terms = Vec::new();
    match engine.index().tokenizer_for_field(title) {
        Ok(mut analyzer) => {
            let mut stream = analyzer.token_stream(text);
            stream.process(&mut |token| terms.push(Term::from_field_text(title, &token.text)));
        }
        Err(e) => tracing::warn!(error = %e, "Title analyzer unavailable"),
    }
    if terms.is_empty() {
        terms.push(Term::from_field_text(title, &text.to_lowercase()));
    }

    let clauses: Vec<(Occur, Box<dyn Query>)> = terms
        .into_iter()
        .map(|term| {
            (
                Occur::Should,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)) as Box<dyn Query>,
            )
        })
        .collect();
    Box::new(BooleanQuery::new(clauses))
}

fn build_filter_clauses(engine: &MediaIndexEngine, filters: &SearchFilters) -> Vec<Box<dyn Query>> {
    let schema = engine.schema();
    let mut clauses: Vec<Box<dyn Query>> = Vec::new();

    for (field, values) in [
        (schema.speaker_exact, &filters.speakers),
        (schema.keyword_exact, &filters.keywords),
        (schema.topic_exact, &filters.topics),
        (schema.media_type, &filters.media_types),
    ] {
        if let Some(group) = any_of(field, values) {
            clauses.push(group);
        }
    }

    let date_bounds = (
        filters.date_start.as_ref().map(to_ticks),
        filters.date_end.as_ref().map(to_ticks),
    );
    if let Some(range) = inclusive_range(date_bounds, |ticks| {
        Term::from_field_i64(schema.created_at_ticks, ticks)
    }) {
        clauses.push(range);
    }

    let duration_bounds = (filters.duration_min_seconds, filters.duration_max_seconds);
    if let Some(range) = inclusive_range(duration_bounds, |seconds| {
        Term::from_field_f64(schema.duration_seconds, seconds)
    }) {
        clauses.push(range);
    }

    clauses
}

/// OR-group of exact terms; `None` when no usable value remains
fn any_of(field: Field, values: &[String]) -> Option<Box<dyn Query>> {
    let terms: Vec<(Occur, Box<dyn Query>)> = values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| {
            let term = Term::from_field_text(field, &value.to_lowercase());
            (
                Occur::Should,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)) as Box<dyn Query>,
            )
        })
        .collect();

    (!terms.is_empty()).then(|| Box::new(BooleanQuery::new(terms)) as Box<dyn Query>)
}

/// Inclusive range over the present bounds; `None` when both are absent
fn inclusive_range<T: Copy>(
    (lower, upper): (Option<T>, Option<T>),
    to_term: impl Fn(T) -> Term,
) -> Option<Box<dyn Query>> {
    if lower.is_none() && upper.is_none() {
        return None;
    }
    let lower = lower.map_or(Bound::Unbounded, |v| Bound::Included(to_term(v)));
    let upper = upper.map_or(Bound::Unbounded, |v| Bound::Included(to_term(v)));
    Some(Box::new(RangeQuery::new(lower, upper)) as Box<dyn Query>)
}
