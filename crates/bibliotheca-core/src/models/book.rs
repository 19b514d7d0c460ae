use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::keywords::derive_keywords;

pub type BookId = Uuid;
pub type FileId = Uuid;

// ─── BookRecord ─────────────────────────────────────────────

/// Normalized catalog entry for one ingested e-book.
/// New records start inactive and become public once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub metadata: BookMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<StoredFile>,

    /// Full-size cover image path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_small: Option<String>,

    #[serde(default)]
    pub active: bool,

    /// Relative path of the published copy inside the books directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,
}

impl BookRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self::from_metadata(BookMetadata {
            title: title.into(),
            ..Default::default()
        })
    }

    pub fn from_metadata(metadata: BookMetadata) -> Self {
        let now = Utc::now();
        let mut record = Self {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            metadata,
            file: None,
            cover: None,
            cover_small: None,
            active: false,
            path: None,
            keywords: Vec::new(),
        };
        record.refresh_keywords();
        record
    }

    pub fn refresh_keywords(&mut self) {
        self.keywords = derive_keywords(&self.metadata);
    }

    /// Apply an administrator edit and recompute the keywords.
    pub fn apply_update(&mut self, update: &BookUpdate) {
        update.apply(&mut self.metadata);
        self.refresh_keywords();
        self.updated_at = Utc::now();
    }
}

// ─── Metadata ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub subjects: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default)]
    pub languages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    /// Metadata keys without dedicated handling (rights, source, type, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

// ─── File ──────────────────────────────────────────────────

/// Reference to the uploaded binary payload in the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: FileId,
    pub name: String,
    pub size_bytes: u64,
}

// ─── Partial updates ───────────────────────────────────────

/// Fields an administrator may change on an existing record.
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub authors: Option<Vec<String>>,
    pub subjects: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, metadata: &mut BookMetadata) {
        if let Some(title) = &self.title {
            metadata.title = title.clone();
        }
        if let Some(publisher) = &self.publisher {
            metadata.publisher = non_empty(publisher);
        }
        if let Some(date) = &self.date {
            metadata.date = non_empty(date);
        }
        if let Some(description) = &self.description {
            metadata.description = non_empty(description);
        }
        if let Some(authors) = &self.authors {
            metadata.authors = without_empty(authors);
        }
        if let Some(subjects) = &self.subjects {
            metadata.subjects = without_empty(subjects);
        }
        if let Some(languages) = &self.languages {
            metadata.languages = without_empty(languages);
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn without_empty(values: &[String]) -> Vec<String> {
    values.iter().filter(|v| !v.is_empty()).cloned().collect()
}

// ─── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_record_new() {
        let record = BookRecord::new("The Old Man");
        assert_eq!(record.metadata.title, "The Old Man");
        assert!(!record.active);
        assert!(record.file.is_none());
        assert_eq!(record.keywords, vec!["The", "Old", "Man"]);
    }

    #[test]
    fn test_update_replaces_only_given_fields() {
        let mut record = BookRecord::new("Draft");
        record.metadata.publisher = Some("Acme".to_string());
        record.metadata.subjects = vec!["Sea".to_string()];

        record.apply_update(&BookUpdate {
            title: Some("Final Title".to_string()),
            authors: Some(vec!["Jane Doe".to_string(), String::new()]),
            ..Default::default()
        });

        assert_eq!(record.metadata.title, "Final Title");
        assert_eq!(record.metadata.authors, vec!["Jane Doe"]);
        assert_eq!(record.metadata.publisher.as_deref(), Some("Acme"));
        assert_eq!(
            record.keywords,
            vec!["Final", "Title", "Jane", "Doe", "Acme", "Sea"]
        );
    }

    #[test]
    fn test_update_with_empty_string_clears_field() {
        let mut metadata = BookMetadata {
            publisher: Some("Acme".to_string()),
            ..Default::default()
        };
        BookUpdate {
            publisher: Some(String::new()),
            ..Default::default()
        }
        .apply(&mut metadata);
        assert_eq!(metadata.publisher, None);
    }

    #[test]
    fn test_empty_update() {
        assert!(BookUpdate::default().is_empty());
        assert!(
            !BookUpdate {
                date: Some("2001".to_string()),
                ..Default::default()
            }
            .is_empty()
        );
    }

    #[test]
    fn test_record_json_roundtrip() {
        let mut record = BookRecord::new("Sample");
        record.metadata.extra.insert("rights".to_string(), "CC-BY".to_string());
        record.file = Some(StoredFile {
            id: Uuid::now_v7(),
            name: "sample.epub".to_string(),
            size_bytes: 42,
        });

        let json = serde_json::to_string(&record).unwrap();
        let restored: BookRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
    }
}
