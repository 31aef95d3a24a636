//! Tantivy schema for media documents
//!
//! Field names are a stable contract: other layers may open the index
//! directly for inspection or migration. Three field conventions apply:
//!
//! - exact-match fields are indexed as one lower-cased token (`exact_match`)
//! - analyzed fields are word-split, lower-cased and stemmed (`content_search`)
//! - numeric fields are indexed and fast so they support ordered range queries

use std::collections::HashSet;
use tantivy::{
    schema::{
        Field, FieldType, IndexRecordOption, NumericOptions, Schema, TextFieldIndexing,
        TextOptions,
    },
    tokenizer::{
        AlphaNumOnlyFilter, Language, LowerCaser, RawTokenizer, RemoveLongFilter,
        SimpleTokenizer, Stemmer, TextAnalyzer, TokenizerManager,
    },
};

/// Tokenizer for untokenized, case-insensitive fields
pub const EXACT_MATCH_TOKENIZER: &str = "exact_match";
/// Tokenizer for free-text fields
pub const CONTENT_SEARCH_TOKENIZER: &str = "content_search";

/// Document field names
pub mod fields {
    pub const ID: &str = "Id";
    pub const FILE_PATH: &str = "FilePath";
    pub const FILE_NAME: &str = "FileName";
    pub const TITLE: &str = "Title";
    pub const DESCRIPTION: &str = "Description";
    pub const TRANSCRIPT: &str = "Transcript";
    pub const TOPICS: &str = "Topics";
    pub const TOPIC_EXACT: &str = "TopicExact";
    pub const KEYWORDS: &str = "Keywords";
    pub const KEYWORD_EXACT: &str = "KeywordExact";
    pub const SPEAKERS: &str = "Speakers";
    pub const SPEAKER_EXACT: &str = "SpeakerExact";
    pub const CREATED_AT: &str = "CreatedAt";
    pub const CREATED_AT_TICKS: &str = "CreatedAtTicks";
    pub const DURATION_SECONDS: &str = "DurationSeconds";
    pub const MEDIA_TYPE: &str = "MediaType";
    pub const SNIPPETS: &str = "Snippets";
}

/// Every field with the tantivy type it must have
const FIELD_TYPES: &[(&str, &str)] = &[
    (fields::ID, "Str"),
    (fields::FILE_PATH, "Str"),
    (fields::FILE_NAME, "Str"),
    (fields::TITLE, "Str"),
    (fields::DESCRIPTION, "Str"),
    (fields::TRANSCRIPT, "Str"),
    (fields::TOPICS, "Str"),
    (fields::TOPIC_EXACT, "Str"),
    (fields::KEYWORDS, "Str"),
    (fields::KEYWORD_EXACT, "Str"),
    (fields::SPEAKERS, "Str"),
    (fields::SPEAKER_EXACT, "Str"),
    (fields::CREATED_AT, "Str"),
    (fields::CREATED_AT_TICKS, "I64"),
    (fields::DURATION_SECONDS, "F64"),
    (fields::MEDIA_TYPE, "Str"),
    (fields::SNIPPETS, "Str"),
];

/// Schema validation errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Field '{field}' not found in schema")]
    FieldNotFound { field: String },

    #[error("Incompatible field type for '{field}': expected {expected}, found {found}")]
    IncompatibleFieldType {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Field '{field}' configuration error: {details}")]
    FieldConfiguration { field: String, details: String },
}

/// Media document schema with resolved field handles
#[derive(Debug, Clone)]
pub struct MediaSchema {
    pub schema: Schema,
    pub id: Field,
    pub file_path: Field,
    pub file_name: Field,
    pub title: Field,
    pub description: Field,
    pub transcript: Field,
    pub topics: Field,
    pub topic_exact: Field,
    pub keywords: Field,
    pub keyword_exact: Field,
    pub speakers: Field,
    pub speaker_exact: Field,
    pub created_at: Field,
    pub created_at_ticks: Field,
    pub duration_seconds: Field,
    pub media_type: Field,
    pub snippets: Field,
}

impl MediaSchema {
    /// Build the schema used for new indexes
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        let exact_stored = exact_options().set_stored();
        let exact_unstored = exact_options();
        let analyzed_stored = TextOptions::default().set_stored().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(CONTENT_SEARCH_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let stored_only = TextOptions::default().set_stored();
        let numeric = NumericOptions::default()
            .set_stored()
            .set_indexed()
            .set_fast();

        let id = builder.add_text_field(fields::ID, exact_stored.clone());
        let file_path = builder.add_text_field(fields::FILE_PATH, exact_stored.clone());
        let file_name = builder.add_text_field(fields::FILE_NAME, exact_stored.clone());
        let title = builder.add_text_field(fields::TITLE, analyzed_stored.clone());
        let description = builder.add_text_field(fields::DESCRIPTION, analyzed_stored.clone());
        let transcript = builder.add_text_field(fields::TRANSCRIPT, analyzed_stored.clone());
        let topics = builder.add_text_field(fields::TOPICS, analyzed_stored.clone());
        let topic_exact = builder.add_text_field(fields::TOPIC_EXACT, exact_unstored.clone());
        let keywords = builder.add_text_field(fields::KEYWORDS, analyzed_stored.clone());
        let keyword_exact = builder.add_text_field(fields::KEYWORD_EXACT, exact_unstored.clone());
        let speakers = builder.add_text_field(fields::SPEAKERS, analyzed_stored);
        let speaker_exact = builder.add_text_field(fields::SPEAKER_EXACT, exact_unstored);
        let created_at = builder.add_text_field(fields::CREATED_AT, stored_only.clone());
        let created_at_ticks = builder.add_i64_field(fields::CREATED_AT_TICKS, numeric.clone());
        let duration_seconds = builder.add_f64_field(fields::DURATION_SECONDS, numeric);
        let media_type = builder.add_text_field(fields::MEDIA_TYPE, exact_stored);
        let snippets = builder.add_text_field(fields::SNIPPETS, stored_only);

        Self {
            schema: builder.build(),
            id,
            file_path,
            file_name,
            title,
            description,
            transcript,
            topics,
            topic_exact,
            keywords,
            keyword_exact,
            speakers,
            speaker_exact,
            created_at,
            created_at_ticks,
            duration_seconds,
            media_type,
            snippets,
        }
    }

    /// Resolve field handles from an existing schema, validating it
    pub fn from_schema(schema: Schema) -> Result<Self, SchemaError> {
        validate(&schema)?;
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SchemaError::FieldNotFound {
                    field: name.to_string(),
                })
        };

        Ok(Self {
            id: field(fields::ID)?,
            file_path: field(fields::FILE_PATH)?,
            file_name: field(fields::FILE_NAME)?,
            title: field(fields::TITLE)?,
            description: field(fields::DESCRIPTION)?,
            transcript: field(fields::TRANSCRIPT)?,
            topics: field(fields::TOPICS)?,
            topic_exact: field(fields::TOPIC_EXACT)?,
            keywords: field(fields::KEYWORDS)?,
            keyword_exact: field(fields::KEYWORD_EXACT)?,
            speakers: field(fields::SPEAKERS)?,
            speaker_exact: field(fields::SPEAKER_EXACT)?,
            created_at: field(fields::CREATED_AT)?,
            created_at_ticks: field(fields::CREATED_AT_TICKS)?,
            duration_seconds: field(fields::DURATION_SECONDS)?,
            media_type: field(fields::MEDIA_TYPE)?,
            snippets: field(fields::SNIPPETS)?,
            schema,
        })
    }

    /// Analyzed fields searched by free-text queries
    #[must_use]
    pub fn text_fields(&self) -> Vec<Field> {
        vec![
            self.title,
            self.description,
            self.transcript,
            self.topics,
            self.keywords,
            self.speakers,
        ]
    }

    /// Get field by name
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<Field> {
        self.schema.get_field(name).ok()
    }

    /// Field whose term dictionary backs facets for a public field name
    ///
    /// Multi-valued filter fields facet over their exact companion so each
    /// value counts as one term instead of one term per word.
    #[must_use]
    pub fn facet_field(&self, name: &str) -> Option<Field> {
        let field = match name {
            n if n.eq_ignore_ascii_case(fields::SPEAKERS) => self.speaker_exact,
            n if n.eq_ignore_ascii_case(fields::KEYWORDS) => self.keyword_exact,
            n if n.eq_ignore_ascii_case(fields::TOPICS) => self.topic_exact,
            other => self
                .schema
                .fields()
                .find(|(_, entry)| entry.name().eq_ignore_ascii_case(other))
                .map(|(field, _)| field)?,
        };

        let entry = self.schema.get_field_entry(field);
        (matches!(entry.field_type(), FieldType::Str(_)) && entry.is_indexed()).then_some(field)
    }

    /// Get all field names for introspection and debugging
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .map(|(_, field_entry)| field_entry.name())
            .collect()
    }

    /// Register the analyzers this schema refers to
    pub fn register_tokenizers(tokenizer_manager: &TokenizerManager) {
        let exact = TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .build();
        tokenizer_manager.register(EXACT_MATCH_TOKENIZER, exact);

        let content = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(40))
            .filter(LowerCaser)
            .filter(AlphaNumOnlyFilter)
            .filter(Stemmer::new(Language::English))
            .build();
        tokenizer_manager.register(CONTENT_SEARCH_TOKENIZER, content);
    }
}

impl Default for MediaSchema {
    fn default() -> Self {
        Self::new()
    }
}

fn exact_options() -> TextOptions {
    TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer(EXACT_MATCH_TOKENIZER)
            .set_index_option(IndexRecordOption::Basic),
    )
}

/// Check an existing schema carries every field with the expected type
fn validate(schema: &Schema) -> Result<(), SchemaError> {
    let existing: HashSet<&str> = schema.fields().map(|(_, entry)| entry.name()).collect();

    for &(name, expected) in FIELD_TYPES {
        if !existing.contains(name) {
            return Err(SchemaError::FieldNotFound {
                field: name.to_string(),
            });
        }
        let field = schema
            .get_field(name)
            .map_err(|_| SchemaError::FieldNotFound {
                field: name.to_string(),
            })?;
        let entry = schema.get_field_entry(field);
        let found = entry.field_type().value_type().name();
        if found != expected {
            return Err(SchemaError::IncompatibleFieldType {
                field: name.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }

    for name in [fields::CREATED_AT_TICKS, fields::DURATION_SECONDS] {
        if let Ok(field) = schema.get_field(name) {
            let entry = schema.get_field_entry(field);
            if !entry.is_indexed() || !entry.is_fast() {
                return Err(SchemaError::FieldConfiguration {
                    field: name.to_string(),
                    details: "Numeric field must be indexed and fast for range queries"
                        .to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_contains_contract_fields() {
        let schema = MediaSchema::new();
        let names = schema.field_names();
        for name in [
            "Id",
            "FilePath",
            "FileName",
            "Title",
            "Description",
            "Transcript",
            "Topics",
            "Keywords",
            "Speakers",
            "CreatedAtTicks",
            "DurationSeconds",
            "MediaType",
        ] {
            assert!(names.contains(&name), "missing field {name}");
        }
        assert_eq!(names.len(), FIELD_TYPES.len());
    }

    #[test]
    fn foreign_schema_is_rejected() {
        let mut builder = Schema::builder();
        builder.add_text_field("Id", tantivy::schema::STRING);
        let result = MediaSchema::from_schema(builder.build());
        assert!(matches!(result, Err(SchemaError::FieldNotFound { .. })));
    }

    #[test]
    fn facet_field_prefers_exact_companions() {
        let schema = MediaSchema::new();
        assert_eq!(schema.facet_field("Speakers"), Some(schema.speaker_exact));
        assert_eq!(schema.facet_field("mediatype"), Some(schema.media_type));
        assert_eq!(schema.facet_field("Transcript"), Some(schema.transcript));
        assert_eq!(schema.facet_field("DurationSeconds"), None);
        assert_eq!(schema.facet_field("Snippets"), None);
        assert_eq!(schema.facet_field("NoSuchField"), None);
    }
}
