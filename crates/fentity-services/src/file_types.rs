//! File type administration and classification

use fentity_core::models::{FileRecord, FileRecordUpdate, FileType, FileTypeUpdate, NewFileType};
use fentity_core::AppError;
use fentity_db::{FileRepository, FileTypeRepository};
use fentity_plugins::ClassifierRegistry;
use uuid::Uuid;

use crate::RecordLocks;

/// Manages file types and assigns them to records through the classifier
#[derive(Clone)]
pub struct FileTypeService {
    types: FileTypeRepository,
    files: FileRepository,
    classifier: ClassifierRegistry,
    record_locks: RecordLocks,
}

impl FileTypeService {
    pub fn new(
        types: FileTypeRepository,
        files: FileRepository,
        classifier: ClassifierRegistry,
        record_locks: RecordLocks,
    ) -> Self {
        Self {
            types,
            files,
            classifier,
            record_locks,
        }
    }

    pub fn classifier(&self) -> &ClassifierRegistry {
        &self.classifier
    }

    pub async fn create(&self, new: NewFileType) -> Result<FileType, AppError> {
        self.types.create(new).await
    }

    pub async fn get(&self, id: &str) -> Result<FileType, AppError> {
        self.types.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<FileType>, AppError> {
        self.types.list().await
    }

    pub async fn update(&self, id: &str, update: FileTypeUpdate) -> Result<FileType, AppError> {
        self.types.update(id, update).await
    }

    /// Delete a type; its records fall back to `undefined`
    pub async fn delete(&self, id: &str) -> Result<u64, AppError> {
        self.types.delete(id).await
    }

    /// Run the classifier against the current type list
    pub async fn classify(&self, record: &FileRecord) -> Result<String, AppError> {
        let file_types = self.types.list().await?;
        self.classify_with(record, &file_types).await
    }

    async fn classify_with(
        &self,
        record: &FileRecord,
        file_types: &[FileType],
    ) -> Result<String, AppError> {
        let file_type = self.classifier.classify(record, file_types).await?;
        if !file_types.iter().any(|t| t.id == file_type) {
            return Err(AppError::Validation(format!(
                "Classifier chose unknown file type '{}' for file {}",
                file_type, record.id
            )));
        }
        Ok(file_type)
    }

    /// Classify a stored record and persist the result under the record lock
    #[tracing::instrument(skip(self), fields(file_id = %id))]
    pub async fn classify_and_assign(&self, id: Uuid) -> Result<FileRecord, AppError> {
        let _guard = self.record_locks.lock(&id).await;

        let record = self.files.get(id).await?;
        let file_type = self.classify(&record).await?;
        if file_type == record.file_type {
            return Ok(record);
        }

        tracing::info!(
            from = %record.file_type,
            to = %file_type,
            "Assigning file type"
        );
        self.files
            .update(id, &FileRecordUpdate::file_type(file_type))
            .await
    }
}
