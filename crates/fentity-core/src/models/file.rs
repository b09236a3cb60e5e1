use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::AppError;

/// Lifecycle status of a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Permanent,
    Temporary,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Permanent => "permanent",
            FileStatus::Temporary => "temporary",
        }
    }
}

impl FromStr for FileStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permanent" => Ok(FileStatus::Permanent),
            "temporary" => Ok(FileStatus::Temporary),
            other => Err(AppError::Validation(format!("Invalid file status: {}", other))),
        }
    }
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Persisted metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    /// Storage locator (blob store key)
    pub uri: String,
    pub filename: String,
    pub filemime: String,
    pub filesize: i64,
    pub status: FileStatus,
    pub file_type: String,
    /// Uploading user; `None` for anonymous uploads
    pub owner_id: Option<Uuid>,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Lowercased extension of the display name, if any
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.filename)
    }

    pub fn is_anonymous(&self) -> bool {
        self.owner_id.is_none()
    }

    pub fn is_permanent(&self) -> bool {
        self.status == FileStatus::Permanent
    }
}

/// Input for creating a file record
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Pre-assigned id (e.g. already used in the storage key); generated when absent
    pub id: Option<Uuid>,
    pub uri: String,
    /// Defaults to the last segment of `uri`
    pub filename: Option<String>,
    pub filemime: String,
    pub filesize: i64,
    pub status: FileStatus,
    /// Defaults to the sentinel `undefined` type
    pub file_type: Option<String>,
    pub owner_id: Option<Uuid>,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, JsonValue>,
    /// Preserved creation time for imports; defaults to now
    pub created_at: Option<DateTime<Utc>>,
}

impl NewFileRecord {
    pub fn new(uri: impl Into<String>, filemime: impl Into<String>, filesize: i64) -> Self {
        Self {
            id: None,
            uri: uri.into(),
            filename: None,
            filemime: filemime.into(),
            filesize,
            status: FileStatus::Permanent,
            file_type: None,
            owner_id: None,
            description: None,
            metadata: BTreeMap::new(),
            created_at: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_status(mut self, status: FileStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, JsonValue>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Display name to store: explicit filename or the locator's last segment
    pub fn resolved_filename(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| filename_from_uri(&self.uri))
    }
}

/// Partial update of a file record. `None` leaves a field unchanged;
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct FileRecordUpdate {
    pub filename: Option<String>,
    pub filemime: Option<String>,
    pub filesize: Option<i64>,
    pub status: Option<FileStatus>,
    pub file_type: Option<String>,
    pub description: Option<Option<String>>,
    pub metadata: Option<BTreeMap<String, JsonValue>>,
}

impl FileRecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.filename.is_none()
            && self.filemime.is_none()
            && self.filesize.is_none()
            && self.status.is_none()
            && self.file_type.is_none()
            && self.description.is_none()
            && self.metadata.is_none()
    }

    pub fn file_type(file_type: impl Into<String>) -> Self {
        Self {
            file_type: Some(file_type.into()),
            ..Self::default()
        }
    }

    pub fn status(status: FileStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Apply the patch to an in-memory copy of the record
    pub fn apply(&self, record: &mut FileRecord) {
        if let Some(ref filename) = self.filename {
            record.filename = filename.clone();
        }
        if let Some(ref filemime) = self.filemime {
            record.filemime = filemime.clone();
        }
        if let Some(filesize) = self.filesize {
            record.filesize = filesize;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(ref file_type) = self.file_type {
            record.file_type = file_type.clone();
        }
        if let Some(ref description) = self.description {
            record.description = description.clone();
        }
        if let Some(ref metadata) = self.metadata {
            record.metadata = metadata.clone();
        }
    }
}

/// Filters for listing file records
#[derive(Debug, Clone)]
pub struct ListFilesQuery {
    pub file_type: Option<String>,
    pub status: Option<FileStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListFilesQuery {
    fn default() -> Self {
        Self {
            file_type: None,
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Last path segment of a storage locator (`files/abc/report.pdf` -> `report.pdf`)
pub fn filename_from_uri(uri: &str) -> String {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(uri)
        .to_string()
}

/// Lowercased extension of a file name, without the dot
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            uri: "files/abc/report.PDF".to_string(),
            filename: "report.PDF".to_string(),
            filemime: "application/pdf".to_string(),
            filesize: 1024,
            status: FileStatus::Permanent,
            file_type: "document".to_string(),
            owner_id: None,
            description: None,
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_filename_from_uri() {
        assert_eq!(filename_from_uri("files/abc/report.pdf"), "report.pdf");
        assert_eq!(filename_from_uri("report.pdf"), "report.pdf");
        assert_eq!(filename_from_uri("files/dir/"), "dir");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("report.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension(".hidden"), None);
    }

    #[test]
    fn test_record_helpers() {
        let record = sample_record();
        assert_eq!(record.extension(), Some("pdf".to_string()));
        assert!(record.is_anonymous());
        assert!(record.is_permanent());
    }

    #[test]
    fn test_update_apply_only_touches_set_fields() {
        let mut record = sample_record();
        let before = record.clone();
        let update = FileRecordUpdate {
            filesize: Some(2048),
            description: Some(Some("Quarterly report".to_string())),
            ..FileRecordUpdate::default()
        };
        assert!(!update.is_empty());
        update.apply(&mut record);

        assert_eq!(record.filesize, 2048);
        assert_eq!(record.description.as_deref(), Some("Quarterly report"));
        assert_eq!(record.filename, before.filename);
        assert_eq!(record.file_type, before.file_type);
    }

    #[test]
    fn test_update_can_clear_description() {
        let mut record = sample_record();
        record.description = Some("old".to_string());
        FileRecordUpdate {
            description: Some(None),
            ..FileRecordUpdate::default()
        }
        .apply(&mut record);
        assert!(record.description.is_none());
    }

    #[test]
    fn test_new_record_resolves_filename_from_uri() {
        let new = NewFileRecord::new("files/x/photo.jpg", "image/jpeg", 10);
        assert_eq!(new.resolved_filename(), "photo.jpg");
        let named = new.with_filename("Holiday.jpg");
        assert_eq!(named.resolved_filename(), "Holiday.jpg");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Permanent".parse::<FileStatus>().unwrap(), FileStatus::Permanent);
        assert!(matches!(
            "deleted".parse::<FileStatus>(),
            Err(AppError::Validation(_))
        ));
    }
}
