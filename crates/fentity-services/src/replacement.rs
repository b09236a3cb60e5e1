//! Replacement workflow
//!
//! Replaces the bytes behind an existing record while keeping its id and
//! locator. The new content is first staged under its own key, then copied
//! over the original locator while both the record and the locator are
//! locked. A failed or timed-out copy leaves the original untouched and keeps
//! the staged copy so the same handle can be committed again.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use fentity_core::hooks::{AuditSink, ReplacementEvent, ReplacementOutcome};
use fentity_core::models::{file_extension, FileRecord, FileRecordUpdate};
use fentity_core::AppError;
use fentity_db::FileRepository;
use fentity_storage::{staging_key, Storage, StorageError};
use serde::Serialize;
use uuid::Uuid;

use crate::{LocatorLocks, RecordLocks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementState {
    Idle,
    Validating,
    Staged,
    Swapping,
    Committed,
    Failed,
}

impl Display for ReplacementState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ReplacementState::Idle => "idle",
            ReplacementState::Validating => "validating",
            ReplacementState::Staged => "staged",
            ReplacementState::Swapping => "swapping",
            ReplacementState::Committed => "committed",
            ReplacementState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Candidate replacement content
#[derive(Debug, Clone)]
pub struct ReplacementUpload {
    pub filename: String,
    pub data: Vec<u8>,
    /// Defaults to the original record's MIME type
    pub filemime: Option<String>,
}

impl ReplacementUpload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
            filemime: None,
        }
    }

    pub fn with_mime(mut self, filemime: impl Into<String>) -> Self {
        self.filemime = Some(filemime.into());
        self
    }
}

/// Handle to a staged replacement
#[derive(Debug, Clone, Serialize)]
pub struct StagedReplacement {
    id: Uuid,
    file_id: Uuid,
    staged_key: String,
    original_name: String,
    new_name: String,
    filemime: String,
    size: u64,
    state: ReplacementState,
    attempts: u32,
    last_error: Option<String>,
}

impl StagedReplacement {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file_id(&self) -> Uuid {
        self.file_id
    }

    /// Blob store key of the staged content
    pub fn staged_key(&self) -> &str {
        &self.staged_key
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    /// Byte length of the staged content
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn state(&self) -> ReplacementState {
        self.state
    }

    /// Number of commit attempts so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[derive(Clone)]
pub struct ReplacementWorkflow {
    files: FileRepository,
    storage: Arc<dyn Storage>,
    audit: Arc<dyn AuditSink>,
    record_locks: RecordLocks,
    locator_locks: LocatorLocks,
    staging_prefix: String,
    max_upload_size_bytes: u64,
    default_deadline: Duration,
}

impl ReplacementWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: FileRepository,
        storage: Arc<dyn Storage>,
        audit: Arc<dyn AuditSink>,
        record_locks: RecordLocks,
        locator_locks: LocatorLocks,
        staging_prefix: impl Into<String>,
        max_upload_size_bytes: u64,
        default_deadline: Duration,
    ) -> Self {
        Self {
            files,
            storage,
            audit,
            record_locks,
            locator_locks,
            staging_prefix: staging_prefix.into(),
            max_upload_size_bytes,
            default_deadline,
        }
    }

    pub fn default_deadline(&self) -> Duration {
        self.default_deadline
    }

    /// Validate the replacement against the record and persist it under a
    /// staging key. A validation failure has no side effects.
    #[tracing::instrument(skip(self, upload), fields(file_id = %file_id, new_name = %upload.filename))]
    pub async fn stage(
        &self,
        file_id: Uuid,
        upload: ReplacementUpload,
    ) -> Result<StagedReplacement, AppError> {
        let record = self.files.get(file_id).await?;

        // Validating
        let original_ext = record.extension();
        let new_ext = file_extension(&upload.filename);
        if original_ext != new_ext {
            return Err(AppError::Validation(format!(
                "The replacement file must have the same extension as the original file ({} vs {})",
                original_ext.as_deref().unwrap_or("none"),
                new_ext.as_deref().unwrap_or("none")
            )));
        }
        if upload.data.len() as u64 > self.max_upload_size_bytes {
            return Err(AppError::Validation(format!(
                "Replacement exceeds the maximum upload size of {} bytes",
                self.max_upload_size_bytes
            )));
        }

        let id = Uuid::new_v4();
        let size = upload.data.len() as u64;
        let key = staging_key(&self.staging_prefix, file_id, id, new_ext.as_deref());
        self.storage.write(&key, upload.data).await?;

        tracing::info!(staged_key = %key, "Replacement staged");

        Ok(StagedReplacement {
            id,
            file_id,
            staged_key: key,
            original_name: record.filename.clone(),
            new_name: upload.filename,
            filemime: upload.filemime.unwrap_or(record.filemime),
            size,
            state: ReplacementState::Staged,
            attempts: 0,
            last_error: None,
        })
    }

    /// Swap the staged content over the record's locator.
    ///
    /// On success the staged copy is removed, the record's size and MIME type
    /// are refreshed and a `Replaced` audit event is recorded. A copy error, an
    /// expired deadline or a failed record update moves the handle to `Failed`,
    /// records a `Failed` audit event and returns `SwapFailure`. The staged copy
    /// is kept in every failure case, so the same handle can be committed again.
    #[tracing::instrument(skip(self, staged), fields(file_id = %staged.file_id, staged_key = %staged.staged_key))]
    pub async fn commit(
        &self,
        staged: &mut StagedReplacement,
        deadline: Option<Duration>,
    ) -> Result<FileRecord, AppError> {
        match staged.state {
            ReplacementState::Staged | ReplacementState::Failed => {}
            other => {
                return Err(AppError::Validation(format!(
                    "Replacement {} cannot be committed from state {}",
                    staged.id, other
                )))
            }
        }

        let _record_guard = self.record_locks.lock(&staged.file_id).await;
        let record = self.files.get(staged.file_id).await?;
        let _locator_guard = self.locator_locks.lock(&record.uri).await;

        staged.state = ReplacementState::Swapping;
        staged.attempts += 1;

        let deadline = deadline.unwrap_or(self.default_deadline);
        let swap = self
            .storage
            .copy_within(&staged.staged_key, &record.uri, Instant::now() + deadline)
            .await;

        if let Err(e) = swap {
            let message = match e {
                StorageError::Timeout(_) => format!("Copy did not finish within {:?}", deadline),
                other => format!("Copy failed: {}", other),
            };
            return Err(self.fail_swap(staged, &record.uri, message).await);
        }

        // The locator already holds the new bytes; from here on every failure
        // must leave the handle retryable.
        let update = FileRecordUpdate {
            filemime: Some(staged.filemime.clone()),
            filesize: Some(staged.size as i64),
            ..FileRecordUpdate::default()
        };
        let updated = match self.files.update(record.id, &update).await {
            Ok(updated) => updated,
            Err(e) => {
                let message = format!("Content swapped but record update failed: {}", e);
                return Err(self.fail_swap(staged, &record.uri, message).await);
            }
        };

        if let Err(e) = self.storage.delete(&staged.staged_key).await {
            tracing::warn!(staged_key = %staged.staged_key, error = %e, "Failed to discard staged copy");
        }

        staged.state = ReplacementState::Committed;
        staged.last_error = None;
        self.record_event(staged, ReplacementOutcome::Replaced, None)
            .await;

        tracing::info!(uri = %record.uri, size_bytes = staged.size, "Replacement committed");
        Ok(updated)
    }

    async fn fail_swap(
        &self,
        staged: &mut StagedReplacement,
        uri: &str,
        message: String,
    ) -> AppError {
        staged.state = ReplacementState::Failed;
        staged.last_error = Some(message.clone());
        tracing::warn!(
            uri = %uri,
            attempt = staged.attempts,
            error = %message,
            "Replacement swap failed, staged copy kept"
        );
        self.record_event(staged, ReplacementOutcome::Failed, Some(message.clone()))
            .await;
        AppError::SwapFailure {
            message,
            staged_key: staged.staged_key.clone(),
        }
    }

    /// Abandon a staged replacement and remove its content
    pub async fn discard(&self, staged: StagedReplacement) -> Result<(), AppError> {
        if staged.state == ReplacementState::Committed {
            return Ok(());
        }
        self.storage.delete(&staged.staged_key).await?;
        tracing::info!(file_id = %staged.file_id, staged_key = %staged.staged_key, "Staged replacement discarded");
        Ok(())
    }

    /// Stage and commit in one call, using the default deadline
    pub async fn replace(
        &self,
        file_id: Uuid,
        upload: ReplacementUpload,
    ) -> Result<FileRecord, AppError> {
        let mut staged = self.stage(file_id, upload).await?;
        self.commit(&mut staged, None).await
    }

    async fn record_event(
        &self,
        staged: &StagedReplacement,
        outcome: ReplacementOutcome,
        detail: Option<String>,
    ) {
        self.audit
            .record_replacement(ReplacementEvent {
                file_id: staged.file_id,
                old_name: staged.original_name.clone(),
                new_name: staged.new_name.clone(),
                outcome,
                detail,
                occurred_at: Utc::now(),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::UploadRequest;
    use crate::setup::Services;
    use crate::test_helpers::{FailingStorage, RecordingAuditSink};
    use fentity_core::Config;

    async fn setup() -> (Services, Arc<FailingStorage>, Arc<RecordingAuditSink>) {
        let storage = Arc::new(FailingStorage::new());
        let audit = Arc::new(RecordingAuditSink::new());
        let services = Services::in_memory_with_audit(Config::default(), storage.clone(), audit.clone())
            .await
            .unwrap();
        (services, storage, audit)
    }

    #[tokio::test]
    async fn test_extension_mismatch_has_no_side_effects() {
        let (services, storage, audit) = setup().await;
        let record = services
            .files
            .upload(UploadRequest::new("report.pdf", "application/pdf", b"%PDF-1".to_vec()))
            .await
            .unwrap();

        let result = services
            .replacement
            .stage(record.id, ReplacementUpload::new("image.png", b"PNG".to_vec()))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(storage.read(&record.uri).await.unwrap(), b"%PDF-1".to_vec());
        assert!(storage.inner().keys_with_prefix("staging/").await.is_empty());
        assert!(audit.events().is_empty());
    }

    #[tokio::test]
    async fn test_extension_comparison_ignores_case() {
        let (services, _, _) = setup().await;
        let record = services
            .files
            .upload(UploadRequest::new("report.pdf", "application/pdf", b"old".to_vec()))
            .await
            .unwrap();

        let staged = services
            .replacement
            .stage(record.id, ReplacementUpload::new("REPORT-v2.PDF", b"new".to_vec()))
            .await
            .unwrap();
        assert_eq!(staged.state(), ReplacementState::Staged);
        assert!(staged.staged_key().starts_with(&format!("staging/{}/", record.id)));
        assert!(staged.staged_key().ends_with(".pdf"));
        assert_eq!(staged.size(), 3);
    }

    #[tokio::test]
    async fn test_commit_twice_is_rejected() {
        let (services, _, _) = setup().await;
        let record = services
            .files
            .upload(UploadRequest::new("a.txt", "text/plain", b"old".to_vec()))
            .await
            .unwrap();

        let mut staged = services
            .replacement
            .stage(record.id, ReplacementUpload::new("b.txt", b"new!".to_vec()))
            .await
            .unwrap();
        services.replacement.commit(&mut staged, None).await.unwrap();
        assert_eq!(staged.state(), ReplacementState::Committed);

        assert!(matches!(
            services.replacement.commit(&mut staged, None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_discard_removes_staged_copy() {
        let (services, storage, _) = setup().await;
        let record = services
            .files
            .upload(UploadRequest::new("a.txt", "text/plain", b"old".to_vec()))
            .await
            .unwrap();

        let staged = services
            .replacement
            .stage(record.id, ReplacementUpload::new("b.txt", b"new".to_vec()))
            .await
            .unwrap();
        let key = staged.staged_key().to_string();
        services.replacement.discard(staged).await.unwrap();

        assert!(!storage.exists(&key).await.unwrap());
        assert_eq!(storage.read(&record.uri).await.unwrap(), b"old".to_vec());
    }
}
