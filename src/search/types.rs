//! Domain types shared across the search module
//!
//! `SearchableContent` is the logical document the index stores. The
//! metadata map the calling layer passes around is narrowed to the fixed
//! `ContentMetadata` struct here; absent values are empty lists or `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key carrying comma-joined speaker names
pub const METADATA_SPEAKERS: &str = "Speakers";
/// Metadata key carrying comma-joined keywords
pub const METADATA_KEYWORDS: &str = "Keywords";
/// Metadata key carrying the single media type token
pub const METADATA_MEDIA_TYPE: &str = "MediaType";

/// A timed sub-segment of a transcript
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSnippet {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// 0.0 to 1.0
    pub confidence: f32,
    pub speaker: Option<String>,
}

/// Filter/exact-match metadata attached to a piece of content
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentMetadata {
    pub speakers: Vec<String>,
    pub keywords: Vec<String>,
    pub media_type: Option<String>,
}

impl ContentMetadata {
    /// Build from the loose string map used by the calling layer
    ///
    /// Keys are matched case-insensitively. Missing or blank values produce
    /// empty lists rather than errors.
    #[must_use]
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let lookup = |key: &str| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        };

        Self {
            speakers: lookup(METADATA_SPEAKERS).map(split_list).unwrap_or_default(),
            keywords: lookup(METADATA_KEYWORDS).map(split_list).unwrap_or_default(),
            media_type: lookup(METADATA_MEDIA_TYPE)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        }
    }

    /// Render back into the comma-joined map convention
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::with_capacity(3);
        if !self.speakers.is_empty() {
            map.insert(METADATA_SPEAKERS.to_string(), self.speakers.join(","));
        }
        if !self.keywords.is_empty() {
            map.insert(METADATA_KEYWORDS.to_string(), self.keywords.join(","));
        }
        if let Some(media_type) = &self.media_type {
            map.insert(METADATA_MEDIA_TYPE.to_string(), media_type.clone());
        }
        map
    }
}

/// The logical document stored in the index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchableContent {
    /// Sole identity of the document
    #[serde(alias = "media_id")]
    pub id: String,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub title: String,
    pub description: String,
    pub transcript: String,
    pub topics: Vec<String>,
    pub metadata: ContentMetadata,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub snippets: Vec<TranscriptSnippet>,
    /// Relevance assigned at query time; never stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SearchableContent {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Assemble content from a finished transcription and the media it belongs to
    #[must_use]
    pub fn from_transcription(media: MediaDescriptor, result: TranscriptionResult) -> Self {
        if !result.media_id.is_empty() && result.media_id != media.id {
            tracing::warn!(
                media_id = %media.id,
                transcription_media_id = %result.media_id,
                "Transcription belongs to a different media id; using the media descriptor id"
            );
        }

        let transcript = result
            .segments
            .iter()
            .map(|segment| segment.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let mut speakers: Vec<String> = Vec::new();
        for speaker in result.segments.iter().filter_map(|s| s.speaker.as_deref()) {
            let speaker = speaker.trim();
            if !speaker.is_empty() && !speakers.iter().any(|known| known == speaker) {
                speakers.push(speaker.to_string());
            }
        }

        let duration_seconds = media
            .duration_seconds
            .or(result.duration_seconds)
            .unwrap_or_else(|| {
                result
                    .segments
                    .iter()
                    .map(|s| s.end_seconds)
                    .fold(0.0, f64::max)
            });

        let file_name = media.file_path.as_deref().and_then(|path| {
            std::path::Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        });

        Self {
            id: media.id,
            file_name,
            file_path: media.file_path,
            title: media.title,
            description: media.description,
            transcript,
            topics: media.topics,
            metadata: ContentMetadata {
                speakers,
                keywords: media.keywords,
                media_type: media.media_type,
            },
            created_at: media.created_at,
            duration_seconds,
            snippets: result.segments,
            score: None,
        }
    }
}

/// Output of the transcription provider for one media item
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionResult {
    pub media_id: String,
    pub language: Option<String>,
    pub duration_seconds: Option<f64>,
    pub segments: Vec<TranscriptSnippet>,
}

/// Media-level facts that accompany a transcription into the index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaDescriptor {
    pub id: String,
    pub file_path: Option<String>,
    pub title: String,
    pub description: String,
    pub media_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: Option<f64>,
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
}

/// Split a comma-joined list, trimming entries and dropping blanks
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
