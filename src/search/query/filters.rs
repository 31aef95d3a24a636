//! Filter intent for searches
//!
//! Within a category any one value matches; every populated category must
//! match. Empty lists and `None` bounds mean the category is inactive.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::search::types::split_list;

/// Filter map keys accepted from the calling layer
pub mod keys {
    pub const SPEAKERS: &str = "speakers";
    pub const KEYWORDS: &str = "keywords";
    pub const TOPICS: &str = "topics";
    pub const MEDIA_TYPES: &str = "media_types";
    pub const DATE_START: &str = "date_start";
    pub const DATE_END: &str = "date_end";
    pub const DURATION_MIN_SECONDS: &str = "duration_min_seconds";
    pub const DURATION_MAX_SECONDS: &str = "duration_max_seconds";
    pub const MIN_CONFIDENCE: &str = "minConfidence";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    pub speakers: Vec<String>,
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
    pub media_types: Vec<String>,
    pub date_start: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub duration_min_seconds: Option<f64>,
    pub duration_max_seconds: Option<f64>,
    /// Prunes returned snippets; never excludes documents
    pub min_confidence: Option<f32>,
}

impl SearchFilters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when at least one category is populated
    #[must_use]
    pub fn has_any_filter(&self) -> bool {
        !self.speakers.is_empty()
            || !self.keywords.is_empty()
            || !self.topics.is_empty()
            || !self.media_types.is_empty()
            || self.date_start.is_some()
            || self.date_end.is_some()
            || self.duration_min_seconds.is_some()
            || self.duration_max_seconds.is_some()
            || self.min_confidence.is_some()
    }

    #[must_use]
    pub fn speakers<I, S>(mut self, speakers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.speakers = speakers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn media_types<I, S>(mut self, media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.media_types = media_types.into_iter().map(Into::into).collect();
        self
    }

    /// Inclusive creation-date bounds
    #[must_use]
    pub fn created_between(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.date_start = start;
        self.date_end = end;
        self
    }

    /// Inclusive duration bounds in seconds
    #[must_use]
    pub fn duration_between(mut self, min_seconds: Option<f64>, max_seconds: Option<f64>) -> Self {
        self.duration_min_seconds = min_seconds;
        self.duration_max_seconds = max_seconds;
        self
    }

    #[must_use]
    pub fn min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Translate the string-keyed filter map used by the calling layer
    ///
    /// Keys match case-insensitively (`min_confidence` is accepted for
    /// `minConfidence`). Values that fail to parse are skipped with a
    /// warning so one bad entry does not discard the rest of the filter.
    #[must_use]
    pub fn from_filter_map(map: &HashMap<String, String>) -> Self {
        let mut filters = Self::default();

        for (key, value) in map {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match normalize_key(key).as_str() {
                "speakers" => filters.speakers = split_list(value),
                "keywords" => filters.keywords = split_list(value),
                "topics" => filters.topics = split_list(value),
                "mediatypes" => filters.media_types = split_list(value),
                "datestart" => filters.date_start = parse_or_warn(key, value, parse_timestamp),
                "dateend" => filters.date_end = parse_or_warn(key, value, parse_timestamp),
                "durationminseconds" => {
                    filters.duration_min_seconds = parse_or_warn(key, value, parse_seconds);
                }
                "durationmaxseconds" => {
                    filters.duration_max_seconds = parse_or_warn(key, value, parse_seconds);
                }
                "minconfidence" => {
                    filters.min_confidence = parse_or_warn(key, value, parse_confidence);
                }
                _ => tracing::warn!(key = %key, "Ignoring unknown filter key"),
            }
        }

        filters
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn parse_or_warn<T>(key: &str, value: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(value);
    if parsed.is_none() {
        tracing::warn!(key = %key, value = %value, "Ignoring unparseable filter value");
    }
    parsed
}

/// ISO-8601 timestamp; offset-less values are UTC, a bare date is midnight
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_seconds(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_confidence(value: &str) -> Option<f32> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_filters_are_inactive() {
        assert!(!SearchFilters::default().has_any_filter());
        assert!(!SearchFilters::from_filter_map(&map(&[("speakers", " ")])).has_any_filter());
    }

    #[test]
    fn each_category_activates_filtering() {
        assert!(SearchFilters::new().speakers(["A"]).has_any_filter());
        assert!(SearchFilters::new().media_types(["Video"]).has_any_filter());
        assert!(
            SearchFilters::new()
                .duration_between(None, Some(10.0))
                .has_any_filter()
        );
        assert!(SearchFilters::new().min_confidence(0.5).has_any_filter());
    }

    #[test]
    fn filter_map_parses_every_key() {
        let filters = SearchFilters::from_filter_map(&map(&[
            ("speakers", "A, B"),
            ("keywords", "objection"),
            ("topics", "opening,closing"),
            ("media_types", "Audio,Video"),
            ("date_start", "2024-03-01T00:00:00Z"),
            ("date_end", "2024-03-31"),
            ("duration_min_seconds", "200"),
            ("duration_max_seconds", "350.5"),
            ("minConfidence", "0.8"),
        ]));

        assert_eq!(filters.speakers, vec!["A", "B"]);
        assert_eq!(filters.keywords, vec!["objection"]);
        assert_eq!(filters.topics, vec!["opening", "closing"]);
        assert_eq!(filters.media_types, vec!["Audio", "Video"]);
        assert_eq!(
            filters.date_start,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            filters.date_end,
            Some(Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap())
        );
        assert_eq!(filters.duration_min_seconds, Some(200.0));
        assert_eq!(filters.duration_max_seconds, Some(350.5));
        assert_eq!(filters.min_confidence, Some(0.8));
    }

    #[test]
    fn bad_values_are_skipped_individually() {
        let filters = SearchFilters::from_filter_map(&map(&[
            ("date_start", "yesterday"),
            ("duration_min_seconds", "NaN"),
            ("speakers", "A"),
        ]));
        assert_eq!(filters.date_start, None);
        assert_eq!(filters.duration_min_seconds, None);
        assert_eq!(filters.speakers, vec!["A"]);
    }

    #[test]
    fn timestamps_accept_offsets_and_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T10:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T08:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 08:00:00"), Some(expected));
        assert_eq!(parse_timestamp("03/01/2024"), None);
    }
}
