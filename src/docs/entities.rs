use std::{collections::HashSet, fmt::Display, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a [Document]. Generated ids are UUID v4 strings, but anything imported
/// from a backup is accepted verbatim.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Clone)]
#[serde(transparent)]
pub struct DocumentId(Arc<str>);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

/// A user-authored note. Serialized with the field names used by exported backups.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|v| v.eq_ignore_ascii_case(tag))
    }
}

/// Optional fields accepted by document creation and updates. `None` means "keep" on update and
/// "use the default" on creation.
#[derive(Debug, Default, Clone)]
pub struct DocumentFields {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl DocumentFields {
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    pub fn with_content(self, content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..self
        }
    }

    pub fn with_tags<I: IntoIterator<Item = S>, S: Into<String>>(self, tags: I) -> Self {
        Self {
            tags: Some(tags.into_iter().map(Into::into).collect()),
            ..self
        }
    }
}

/// Tags behave as a set. Blank entries and repeats are dropped, the first spelling wins.
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}

/// Keeps the first document of every id. Returns the ids of the documents that were dropped.
pub fn dedup_by_id(documents: &mut Vec<Document>) -> Vec<DocumentId> {
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();
    documents.retain(|v| {
        if seen.insert(v.id.clone()) {
            true
        } else {
            dropped.push(v.id.clone());
            false
        }
    });
    dropped
}
