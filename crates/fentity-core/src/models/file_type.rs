use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::UNDEFINED_FILE_TYPE;

/// A file type (bundle): named classification applied to files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileType {
    /// Machine name, immutable
    pub id: String,
    pub label: String,
    pub description: String,
    /// MIME patterns this type accepts (`image/*`, `application/pdf`)
    pub mimetypes: Vec<String>,
    pub weight: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileType {
    pub fn is_undefined(&self) -> bool {
        self.id == UNDEFINED_FILE_TYPE
    }

    /// Whether any of this type's patterns accepts `mime`
    pub fn matches_mime(&self, mime: &str) -> bool {
        self.mimetypes
            .iter()
            .any(|pattern| mime_pattern_matches(pattern, mime))
    }
}

/// Input for creating a file type
#[derive(Debug, Clone)]
pub struct NewFileType {
    pub id: String,
    pub label: String,
    pub description: String,
    pub mimetypes: Vec<String>,
    pub weight: i32,
}

impl NewFileType {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            mimetypes: Vec::new(),
            weight: 0,
        }
    }

    pub fn with_mimetypes<I, S>(mut self, mimetypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mimetypes = mimetypes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

/// Partial update of a file type; the machine name cannot change
#[derive(Debug, Clone, Default)]
pub struct FileTypeUpdate {
    pub label: Option<String>,
    pub description: Option<String>,
    pub mimetypes: Option<Vec<String>>,
    pub weight: Option<i32>,
}

/// Match a MIME pattern against a concrete type.
///
/// Supports exact matches, `type/*` and `*/*`. Comparison ignores case and
/// any parameters after `;`.
pub fn mime_pattern_matches(pattern: &str, mime: &str) -> bool {
    let pattern = pattern.trim().to_lowercase();
    let mime = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if pattern == "*/*" || pattern == "*" {
        return !mime.is_empty();
    }

    match pattern.strip_suffix("/*") {
        Some(major) => mime
            .split_once('/')
            .map(|(mime_major, _)| mime_major == major)
            .unwrap_or(false),
        None => pattern == mime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_pattern_matches() {
        assert!(mime_pattern_matches("image/*", "image/png"));
        assert!(mime_pattern_matches("IMAGE/*", "image/PNG"));
        assert!(mime_pattern_matches("application/pdf", "application/pdf"));
        assert!(mime_pattern_matches("text/plain", "text/plain; charset=utf-8"));
        assert!(mime_pattern_matches("*/*", "video/mp4"));
        assert!(!mime_pattern_matches("image/*", "video/mp4"));
        assert!(!mime_pattern_matches("image/*", "imagex"));
        assert!(!mime_pattern_matches("application/pdf", "application/zip"));
    }

    #[test]
    fn test_file_type_matches_any_pattern() {
        let now = Utc::now();
        let file_type = FileType {
            id: "document".to_string(),
            label: "Document".to_string(),
            description: String::new(),
            mimetypes: vec!["application/pdf".to_string(), "text/*".to_string()],
            weight: 0,
            created_at: now,
            updated_at: now,
        };
        assert!(file_type.matches_mime("text/csv"));
        assert!(file_type.matches_mime("application/pdf"));
        assert!(!file_type.matches_mime("image/jpeg"));
        assert!(!file_type.is_undefined());
    }
}
