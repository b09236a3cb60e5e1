//! Export and import of file records as portable JSON documents

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use fentity_core::constants::INTERCHANGE_FORMAT_VERSION;
use fentity_core::models::{FileRecord, InterchangeDoc, NewFileRecord};
use fentity_core::validation::{validate_description, validate_locator, validate_metadata};
use fentity_core::AppError;
use fentity_db::{FileRepository, FileTypeRepository};
use fentity_storage::Storage;
use uuid::Uuid;

use crate::LocatorLocks;

/// Converts records (content included) to and from [`InterchangeDoc`]
#[derive(Clone)]
pub struct InterchangeService {
    files: FileRepository,
    types: FileTypeRepository,
    storage: Arc<dyn Storage>,
    locator_locks: LocatorLocks,
}

impl InterchangeService {
    pub fn new(
        files: FileRepository,
        types: FileTypeRepository,
        storage: Arc<dyn Storage>,
        locator_locks: LocatorLocks,
    ) -> Self {
        Self {
            files,
            types,
            storage,
            locator_locks,
        }
    }

    /// Snapshot a record and its content
    #[tracing::instrument(skip(self), fields(file_id = %id))]
    pub async fn export_record(&self, id: Uuid) -> Result<InterchangeDoc, AppError> {
        let record = self.files.get(id).await?;
        let content = self.storage.read(&record.uri).await?;

        Ok(InterchangeDoc {
            format_version: INTERCHANGE_FORMAT_VERSION,
            uri: record.uri,
            filename: record.filename,
            filemime: record.filemime,
            filesize: record.filesize,
            status: record.status,
            file_type: record.file_type,
            owner_id: record.owner_id,
            description: record.description,
            metadata: record.metadata,
            created_at: record.created_at,
            content: STANDARD.encode(content),
        })
    }

    /// Recreate a record from a document under a fresh id.
    ///
    /// The whole document is checked before anything is written. If the
    /// record insert fails after the content was stored, the content is
    /// removed again, so a failed import leaves nothing behind.
    #[tracing::instrument(skip(self, doc), fields(uri = %doc.uri))]
    pub async fn import_record(&self, doc: InterchangeDoc) -> Result<FileRecord, AppError> {
        let content = Self::decode_content(&doc)?;
        if let Some(ref description) = doc.description {
            validate_description(description)?;
        }
        validate_metadata(&doc.metadata)?;
        if !self.types.exists(&doc.file_type).await? {
            return Err(AppError::Validation(format!(
                "Unknown file type '{}'",
                doc.file_type
            )));
        }

        let _locator_guard = self.locator_locks.lock(&doc.uri).await;
        if self.files.find_by_uri(&doc.uri).await?.is_some() {
            return Err(AppError::DuplicateLocator(doc.uri));
        }

        self.storage.write(&doc.uri, content).await?;

        let mut new = NewFileRecord::new(doc.uri.clone(), doc.filemime, doc.filesize)
            .with_filename(doc.filename)
            .with_status(doc.status)
            .with_file_type(doc.file_type)
            .with_metadata(doc.metadata)
            .with_created_at(doc.created_at);
        new.owner_id = doc.owner_id;
        new.description = doc.description;

        match self.files.create_record(new).await {
            Ok(record) => {
                tracing::info!(file_id = %record.id, "File record imported");
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&doc.uri).await {
                    tracing::error!(uri = %doc.uri, error = %cleanup, "Failed to remove content of failed import");
                }
                Err(e)
            }
        }
    }

    /// Structural checks that make a document malformed rather than invalid
    fn decode_content(doc: &InterchangeDoc) -> Result<Vec<u8>, AppError> {
        if doc.format_version != INTERCHANGE_FORMAT_VERSION {
            return Err(AppError::Serialization(format!(
                "Unsupported format version {} (expected {})",
                doc.format_version, INTERCHANGE_FORMAT_VERSION
            )));
        }
        validate_locator(&doc.uri)
            .map_err(|e| AppError::Serialization(format!("Invalid uri: {}", e)))?;
        if doc.filename.trim().is_empty() {
            return Err(AppError::Serialization("Missing filename".to_string()));
        }

        let content = STANDARD
            .decode(doc.content.as_bytes())
            .map_err(|e| AppError::Serialization(format!("Content is not valid base64: {}", e)))?;
        if content.len() as i64 != doc.filesize {
            return Err(AppError::Serialization(format!(
                "Declared size {} does not match content size {}",
                doc.filesize,
                content.len()
            )));
        }
        Ok(content)
    }

    pub fn to_json(doc: &InterchangeDoc) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(doc)?)
    }

    pub fn from_json(json: &str) -> Result<InterchangeDoc, AppError> {
        serde_json::from_str(json).map_err(|e| {
            AppError::Serialization(format!("Malformed interchange document: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::UploadRequest;
    use crate::setup::Services;
    use fentity_core::Config;
    use fentity_storage::MemoryStorage;

    async fn setup() -> (Services, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let services = Services::in_memory(Config::default(), storage.clone())
            .await
            .unwrap();
        (services, storage)
    }

    #[tokio::test]
    async fn test_export_encodes_content() {
        let (services, _) = setup().await;
        let record = services
            .files
            .upload(UploadRequest::new("hello.txt", "text/plain", b"hello".to_vec()))
            .await
            .unwrap();

        let doc = services.interchange.export_record(record.id).await.unwrap();
        assert_eq!(doc.format_version, INTERCHANGE_FORMAT_VERSION);
        assert_eq!(doc.content, "aGVsbG8=");

        let json = InterchangeService::to_json(&doc).unwrap();
        assert!(json.contains("\"type\": \"undefined\""));
        assert_eq!(InterchangeService::from_json(&json).unwrap(), doc);
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_documents_without_writes() {
        let (services, storage) = setup().await;
        let record = services
            .files
            .upload(UploadRequest::new("hello.txt", "text/plain", b"hello".to_vec()))
            .await
            .unwrap();
        let mut doc = services.interchange.export_record(record.id).await.unwrap();
        services.files.delete(record.id).await.unwrap();
        assert!(storage.is_empty().await);

        let mut bad_size = doc.clone();
        bad_size.filesize = 99;
        let mut bad_content = doc.clone();
        bad_content.content = "not base64!!".to_string();
        let mut bad_version = doc.clone();
        bad_version.format_version = 42;

        for bad in [bad_size, bad_content, bad_version] {
            assert!(matches!(
                services.interchange.import_record(bad).await,
                Err(AppError::Serialization(_))
            ));
        }
        assert!(storage.is_empty().await);
        assert!(services.files.find_by_uri(&doc.uri).await.unwrap().is_none());

        doc.file_type = "ghost".to_string();
        assert!(matches!(
            services.interchange.import_record(doc).await,
            Err(AppError::Validation(_))
        ));
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_import_into_used_locator_fails() {
        let (services, storage) = setup().await;
        let record = services
            .files
            .upload(UploadRequest::new("hello.txt", "text/plain", b"hello".to_vec()))
            .await
            .unwrap();
        let mut doc = services.interchange.export_record(record.id).await.unwrap();
        doc.content = STANDARD.encode(b"other");
        doc.filesize = 5;

        assert!(matches!(
            services.interchange.import_record(doc).await,
            Err(AppError::DuplicateLocator(_))
        ));
        assert_eq!(storage.read(&record.uri).await.unwrap(), b"hello".to_vec());
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            InterchangeService::from_json("{\"uri\": 3}"),
            Err(AppError::Serialization(_))
        ));
    }
}
