use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fentity_core::constants::{MAX_LIST_LIMIT, UNDEFINED_FILE_TYPE};
use fentity_core::models::{FileRecord, FileRecordUpdate, FileStatus, ListFilesQuery, NewFileRecord};
use fentity_core::validation::{
    validate_description, validate_label, validate_locator, validate_metadata,
};
use fentity_core::AppError;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

const FILE_COLUMNS: &str = "id, uri, filename, filemime, filesize, status, file_type, owner_id, \
                            description, metadata, created_at, updated_at";

#[derive(Debug, FromRow)]
struct FileRow {
    id: Uuid,
    uri: String,
    filename: String,
    filemime: String,
    filesize: i64,
    status: String,
    file_type: String,
    owner_id: Option<Uuid>,
    description: Option<String>,
    metadata: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = AppError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        let metadata: BTreeMap<String, JsonValue> = serde_json::from_str(&row.metadata)
            .map_err(|e| AppError::Internal(format!("Corrupt metadata for file {}: {}", row.id, e)))?;
        Ok(FileRecord {
            id: row.id,
            uri: row.uri,
            filename: row.filename,
            filemime: row.filemime,
            filesize: row.filesize,
            status: row
                .status
                .parse()
                .map_err(|_| AppError::Internal(format!("Corrupt status for file {}", row.id)))?,
            file_type: row.file_type,
            owner_id: row.owner_id,
            description: row.description,
            metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_unique_violation(err: sqlx::Error, uri: &str) -> AppError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateLocator(uri.to_string())
        }
        other => other.into(),
    }
}

async fn ensure_type_exists(conn: &mut SqliteConnection, file_type: &str) -> Result<(), AppError> {
    let exists = sqlx::query_scalar::<Sqlite, bool>(
        "SELECT EXISTS(SELECT 1 FROM file_types WHERE id = ?)",
    )
    .bind(file_type)
    .fetch_one(conn)
    .await?;
    if !exists {
        return Err(AppError::Validation(format!(
            "Unknown file type '{}'",
            file_type
        )));
    }
    Ok(())
}

fn validate_fields(
    filename: &str,
    filesize: i64,
    description: Option<&str>,
    metadata: &BTreeMap<String, JsonValue>,
) -> Result<(), AppError> {
    validate_label(filename)
        .map_err(|_| AppError::Validation("File name cannot be empty".to_string()))?;
    if filesize < 0 {
        return Err(AppError::Validation("File size cannot be negative".to_string()));
    }
    if let Some(description) = description {
        validate_description(description)?;
    }
    validate_metadata(metadata)
}

/// Repository for file records.
///
/// Deleted records keep their row (with `deleted_at` set) but are invisible to
/// every read, and their locator becomes available again.
#[derive(Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a record for content already stored at `uri`
    pub async fn create(
        &self,
        uri: impl Into<String>,
        filemime: impl Into<String>,
        filesize: i64,
    ) -> Result<FileRecord, AppError> {
        self.create_record(NewFileRecord::new(uri, filemime, filesize))
            .await
    }

    #[tracing::instrument(skip(self, new), fields(db.table = "files", db.operation = "insert", uri = %new.uri))]
    pub async fn create_record(&self, new: NewFileRecord) -> Result<FileRecord, AppError> {
        validate_locator(&new.uri)?;
        let filename = new.resolved_filename();
        validate_fields(&filename, new.filesize, new.description.as_deref(), &new.metadata)?;

        let file_type = new
            .file_type
            .clone()
            .unwrap_or_else(|| UNDEFINED_FILE_TYPE.to_string());
        let id = new.id.unwrap_or_else(Uuid::new_v4);
        let now = Utc::now();
        let metadata = serde_json::to_string(&new.metadata)?;

        let mut tx = self.pool.begin().await?;
        ensure_type_exists(&mut tx, &file_type).await?;

        let row = sqlx::query_as::<Sqlite, FileRow>(&format!(
            "INSERT INTO files ({cols}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {cols}",
            cols = FILE_COLUMNS
        ))
        .bind(id)
        .bind(&new.uri)
        .bind(&filename)
        .bind(&new.filemime)
        .bind(new.filesize)
        .bind(new.status.as_str())
        .bind(&file_type)
        .bind(new.owner_id)
        .bind(&new.description)
        .bind(&metadata)
        .bind(new.created_at.unwrap_or(now))
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, &new.uri))?;

        tx.commit().await?;

        tracing::debug!(file_id = %row.id, file_type = %row.file_type, "File record created");
        row.try_into()
    }

    /// Get a live record by id
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<FileRecord, AppError> {
        sqlx::query_as::<Sqlite, FileRow>(&format!(
            "SELECT {} FROM files WHERE id = ? AND deleted_at IS NULL",
            FILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?
        .try_into()
    }

    /// Find the live record stored at `uri`
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn find_by_uri(&self, uri: &str) -> Result<Option<FileRecord>, AppError> {
        sqlx::query_as::<Sqlite, FileRow>(&format!(
            "SELECT {} FROM files WHERE uri = ? AND deleted_at IS NULL",
            FILE_COLUMNS
        ))
        .bind(uri)
        .fetch_optional(&self.pool)
        .await?
        .map(FileRecord::try_from)
        .transpose()
    }

    /// Apply a partial update. The read, the patch and the write happen in one
    /// transaction, so either every field in `update` persists or none does.
    #[tracing::instrument(skip(self, update), fields(db.table = "files", db.operation = "update", db.record_id = %id))]
    pub async fn update(&self, id: Uuid, update: &FileRecordUpdate) -> Result<FileRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut record: FileRecord = sqlx::query_as::<Sqlite, FileRow>(&format!(
            "SELECT {} FROM files WHERE id = ? AND deleted_at IS NULL",
            FILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?
        .try_into()?;

        if update.is_empty() {
            return Ok(record);
        }

        if let Some(ref file_type) = update.file_type {
            ensure_type_exists(&mut tx, file_type).await?;
        }

        update.apply(&mut record);
        validate_fields(
            &record.filename,
            record.filesize,
            record.description.as_deref(),
            &record.metadata,
        )?;

        let row = sqlx::query_as::<Sqlite, FileRow>(&format!(
            "UPDATE files SET filename = ?, filemime = ?, filesize = ?, status = ?, file_type = ?, \
             description = ?, metadata = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(&record.filename)
        .bind(&record.filemime)
        .bind(record.filesize)
        .bind(record.status.as_str())
        .bind(&record.file_type)
        .bind(&record.description)
        .bind(serde_json::to_string(&record.metadata)?)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Soft-delete a record and return it as it was.
    ///
    /// Fails with `NotFound` when the record is absent or already deleted. The
    /// caller is responsible for removing the blob.
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<FileRecord, AppError> {
        let row = sqlx::query_as::<Sqlite, FileRow>(&format!(
            "UPDATE files SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

        tracing::debug!(file_id = %id, "File record soft-deleted");
        row.try_into()
    }

    /// List live records, newest first
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn list(&self, query: &ListFilesQuery) -> Result<Vec<FileRecord>, AppError> {
        let limit = query.limit.clamp(1, MAX_LIST_LIMIT);
        let offset = query.offset.max(0);

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM files WHERE deleted_at IS NULL",
            FILE_COLUMNS
        ));
        if let Some(ref file_type) = query.file_type {
            builder.push(" AND file_type = ").push_bind(file_type.clone());
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder
            .push(" ORDER BY created_at DESC, id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<FileRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(FileRecord::try_from).collect()
    }

    /// Number of live records per file type, ordered by type id
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn count_by_type(&self) -> Result<Vec<(String, i64)>, AppError> {
        let counts = sqlx::query_as::<Sqlite, (String, i64)>(
            "SELECT file_type, COUNT(*) FROM files WHERE deleted_at IS NULL \
             GROUP BY file_type ORDER BY file_type ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Move every live record of type `from` to type `to`
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "update"))]
    pub async fn reassign_type(&self, from: &str, to: &str) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        ensure_type_exists(&mut tx, to).await?;

        let result = sqlx::query(
            "UPDATE files SET file_type = ?, updated_at = ? WHERE file_type = ? AND deleted_at IS NULL",
        )
        .bind(to)
        .bind(Utc::now())
        .bind(from)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Set the status of a live record
    pub async fn set_status(&self, id: Uuid, status: FileStatus) -> Result<FileRecord, AppError> {
        self.update(id, &FileRecordUpdate::status(status)).await
    }
}
