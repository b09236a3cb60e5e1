//! File upload, lookup, update and deletion

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use fentity_core::constants::UNDEFINED_FILE_TYPE;
use fentity_core::models::{
    FileRecord, FileRecordUpdate, FileStatus, ListFilesQuery, NewFileRecord,
};
use fentity_core::validation::{validate_description, validate_metadata};
use fentity_core::AppError;
use fentity_db::FileRepository;
use fentity_storage::{file_key, staging_dir, ByteStream, Storage};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::file_types::FileTypeService;
use crate::RecordLocks;

/// A new upload: content plus the attributes known at upload time
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub filemime: String,
    pub data: Vec<u8>,
    pub owner_id: Option<Uuid>,
    pub status: FileStatus,
    pub description: Option<String>,
    pub metadata: BTreeMap<String, JsonValue>,
}

impl UploadRequest {
    pub fn new(filename: impl Into<String>, filemime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            filemime: filemime.into(),
            data,
            owner_id: None,
            status: FileStatus::Permanent,
            description: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_status(mut self, status: FileStatus) -> Self {
        self.status = status;
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
}

/// Service coordinating file records with their stored content
#[derive(Clone)]
pub struct FileService {
    files: FileRepository,
    storage: Arc<dyn Storage>,
    file_types: FileTypeService,
    record_locks: RecordLocks,
    staging_prefix: String,
    max_upload_size_bytes: u64,
}

impl FileService {
    pub fn new(
        files: FileRepository,
        storage: Arc<dyn Storage>,
        file_types: FileTypeService,
        record_locks: RecordLocks,
        staging_prefix: impl Into<String>,
        max_upload_size_bytes: u64,
    ) -> Self {
        Self {
            files,
            storage,
            file_types,
            record_locks,
            staging_prefix: staging_prefix.into(),
            max_upload_size_bytes,
        }
    }

    /// Store the content, classify it and persist the record.
    ///
    /// Nothing is persisted when validation or classification fails; a record
    /// insert failure removes the already written blob again.
    #[tracing::instrument(skip(self, request), fields(filename = %request.filename, size_bytes = request.data.len()))]
    pub async fn upload(&self, request: UploadRequest) -> Result<FileRecord, AppError> {
        if request.data.len() as u64 > self.max_upload_size_bytes {
            return Err(AppError::Validation(format!(
                "File exceeds the maximum upload size of {} bytes",
                self.max_upload_size_bytes
            )));
        }
        if request.filename.trim().is_empty() {
            return Err(AppError::Validation("File name cannot be empty".to_string()));
        }
        if let Some(ref description) = request.description {
            validate_description(description)?;
        }
        validate_metadata(&request.metadata)?;

        let id = Uuid::new_v4();
        let uri = file_key(id, &request.filename);
        let filesize = request.data.len() as i64;

        let now = Utc::now();
        let provisional = FileRecord {
            id,
            uri: uri.clone(),
            filename: request.filename.clone(),
            filemime: request.filemime.clone(),
            filesize,
            status: request.status,
            file_type: UNDEFINED_FILE_TYPE.to_string(),
            owner_id: request.owner_id,
            description: request.description.clone(),
            metadata: request.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        let file_type = self.file_types.classify(&provisional).await?;

        self.storage.write(&uri, request.data).await?;

        let mut new = NewFileRecord::new(uri.clone(), request.filemime, filesize)
            .with_id(id)
            .with_filename(request.filename)
            .with_status(request.status)
            .with_file_type(file_type)
            .with_metadata(request.metadata);
        new.owner_id = request.owner_id;
        new.description = request.description;

        match self.files.create_record(new).await {
            Ok(record) => {
                tracing::info!(
                    file_id = %record.id,
                    uri = %record.uri,
                    file_type = %record.file_type,
                    "File uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&uri).await {
                    tracing::warn!(uri = %uri, error = %cleanup, "Failed to remove orphaned upload");
                }
                Err(e)
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<FileRecord, AppError> {
        self.files.get(id).await
    }

    pub async fn list(&self, query: &ListFilesQuery) -> Result<Vec<FileRecord>, AppError> {
        self.files.list(query).await
    }

    pub async fn count_by_type(&self) -> Result<Vec<(String, i64)>, AppError> {
        self.files.count_by_type().await
    }

    /// Apply a partial update under the record lock
    pub async fn update(&self, id: Uuid, update: &FileRecordUpdate) -> Result<FileRecord, AppError> {
        let _guard = self.record_locks.lock(&id).await;
        self.files.update(id, update).await
    }

    pub async fn set_status(&self, id: Uuid, status: FileStatus) -> Result<FileRecord, AppError> {
        self.update(id, &FileRecordUpdate::status(status)).await
    }

    /// Re-run classification for a stored record
    pub async fn classify_and_assign(&self, id: Uuid) -> Result<FileRecord, AppError> {
        self.file_types.classify_and_assign(id).await
    }

    /// Delete the record and its content.
    ///
    /// Holds the record lock, so a replacement commit on the same file either
    /// finishes first or sees the record gone.
    #[tracing::instrument(skip(self), fields(file_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<FileRecord, AppError> {
        let _guard = self.record_locks.lock(&id).await;

        let record = self.files.delete(id).await?;
        if let Err(e) = self.storage.delete(&record.uri).await {
            tracing::error!(uri = %record.uri, error = %e, "Record deleted but content removal failed");
            return Err(e.into());
        }

        // Staged replacements can no longer be committed
        let staged = staging_dir(&self.staging_prefix, id);
        if let Err(e) = self.storage.delete_prefix(&staged).await {
            tracing::warn!(prefix = %staged, error = %e, "Failed to remove staged replacements");
        }

        tracing::info!(uri = %record.uri, "File deleted");
        Ok(record)
    }

    pub async fn read_content(&self, id: Uuid) -> Result<Vec<u8>, AppError> {
        let record = self.files.get(id).await?;
        Ok(self.storage.read(&record.uri).await?)
    }

    pub async fn read_content_stream(&self, id: Uuid) -> Result<ByteStream, AppError> {
        let record = self.files.get(id).await?;
        Ok(self.storage.read_stream(&record.uri).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::Services;
    use fentity_core::models::NewFileType;
    use fentity_core::Config;
    use fentity_storage::MemoryStorage;
    use serde_json::json;

    async fn services() -> (Services, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let services = Services::in_memory(Config::default(), storage.clone())
            .await
            .unwrap();
        (services, storage)
    }

    #[tokio::test]
    async fn test_upload_classifies_by_mime() {
        let (services, storage) = services().await;
        services
            .file_types
            .create(NewFileType::new("image", "Image").with_mimetypes(["image/*"]))
            .await
            .unwrap();

        let record = services
            .files
            .upload(
                UploadRequest::new("cat.png", "image/png", vec![1, 2, 3])
                    .with_owner(Uuid::new_v4()),
            )
            .await
            .unwrap();

        assert_eq!(record.file_type, "image");
        assert_eq!(record.filesize, 3);
        assert_eq!(record.uri, format!("files/{}/cat.png", record.id));
        assert_eq!(storage.read(&record.uri).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_content() {
        let storage = Arc::new(MemoryStorage::new());
        let config = Config {
            max_upload_size_bytes: 4,
            ..Config::default()
        };
        let services = Services::in_memory(config, storage.clone()).await.unwrap();

        let result = services
            .files
            .upload(UploadRequest::new("big.bin", "application/octet-stream", vec![0; 5]))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_upload_with_invalid_metadata_writes_nothing() {
        let (services, storage) = services().await;
        let mut metadata = BTreeMap::new();
        metadata.insert("_system_secret".to_string(), json!("x"));

        let result = services
            .files
            .upload(UploadRequest::new("a.txt", "text/plain", b"a".to_vec()).with_metadata(metadata))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_blob() {
        let (services, storage) = services().await;
        let record = services
            .files
            .upload(UploadRequest::new("notes.txt", "text/plain", b"hello".to_vec()))
            .await
            .unwrap();

        services.files.delete(record.id).await.unwrap();

        assert!(matches!(services.files.get(record.id).await, Err(AppError::NotFound(_))));
        assert!(!storage.exists(&record.uri).await.unwrap());
        assert!(matches!(
            services.files.delete(record.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_staged_replacements() {
        let (services, storage) = services().await;
        let record = services
            .files
            .upload(UploadRequest::new("notes.txt", "text/plain", b"hello".to_vec()))
            .await
            .unwrap();
        let other = services
            .files
            .upload(UploadRequest::new("other.txt", "text/plain", b"keep".to_vec()))
            .await
            .unwrap();

        let uploads = [
            (record.id, "notes-v2.txt"),
            (record.id, "notes-v3.txt"),
            (other.id, "other-v2.txt"),
        ];
        for (id, name) in uploads {
            services
                .replacement
                .stage(id, crate::ReplacementUpload::new(name, b"next".to_vec()))
                .await
                .unwrap();
        }
        assert_eq!(storage.keys_with_prefix("staging/").await.len(), 3);

        services.files.delete(record.id).await.unwrap();

        let left = storage.keys_with_prefix("staging/").await;
        assert_eq!(left.len(), 1);
        assert!(left[0].starts_with(&format!("staging/{}/", other.id)));
    }

    #[tokio::test]
    async fn test_set_status_and_read_content() {
        let (services, _) = services().await;
        let record = services
            .files
            .upload(
                UploadRequest::new("draft.txt", "text/plain", b"draft".to_vec())
                    .with_status(FileStatus::Temporary),
            )
            .await
            .unwrap();
        assert!(!record.is_permanent());

        let updated = services
            .files
            .set_status(record.id, FileStatus::Permanent)
            .await
            .unwrap();
        assert!(updated.is_permanent());
        assert_eq!(services.files.read_content(record.id).await.unwrap(), b"draft".to_vec());
    }

    #[tokio::test]
    async fn test_read_content_stream() {
        use futures::StreamExt;

        let (services, _) = services().await;
        let record = services
            .files
            .upload(UploadRequest::new("log.txt", "text/plain", b"line one\nline two\n".to_vec()))
            .await
            .unwrap();

        let mut stream = services.files.read_content_stream(record.id).await.unwrap();
        let mut content = Vec::new();
        while let Some(chunk) = stream.next().await {
            content.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(content, b"line one\nline two\n".to_vec());
    }
}
