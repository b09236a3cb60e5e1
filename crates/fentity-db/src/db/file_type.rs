use chrono::{DateTime, Utc};
use fentity_core::constants::UNDEFINED_FILE_TYPE;
use fentity_core::models::{FileType, FileTypeUpdate, NewFileType};
use fentity_core::validation::{validate_file_type_id, validate_label};
use fentity_core::AppError;
use sqlx::{FromRow, Sqlite, SqlitePool};

const FILE_TYPE_COLUMNS: &str = "id, label, description, mimetypes, weight, created_at, updated_at";

#[derive(Debug, FromRow)]
struct FileTypeRow {
    id: String,
    label: String,
    description: String,
    mimetypes: String,
    weight: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FileTypeRow> for FileType {
    type Error = AppError;

    fn try_from(row: FileTypeRow) -> Result<Self, Self::Error> {
        Ok(FileType {
            mimetypes: serde_json::from_str(&row.mimetypes).map_err(|e| {
                AppError::Internal(format!("Corrupt mimetypes for type {}: {}", row.id, e))
            })?,
            id: row.id,
            label: row.label,
            description: row.description,
            weight: row.weight,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn validate_mimetypes(mimetypes: &[String]) -> Result<(), AppError> {
    for pattern in mimetypes {
        let pattern = pattern.trim();
        let valid = pattern == "*"
            || pattern
                .split_once('/')
                .map(|(major, minor)| !major.is_empty() && !minor.is_empty())
                .unwrap_or(false);
        if !valid {
            return Err(AppError::Validation(format!(
                "Invalid MIME pattern '{}'",
                pattern
            )));
        }
    }
    Ok(())
}

/// Repository for file types (bundles)
#[derive(Clone)]
pub struct FileTypeRepository {
    pool: SqlitePool,
}

impl FileTypeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, new), fields(db.table = "file_types", db.operation = "insert", file_type = %new.id))]
    pub async fn create(&self, new: NewFileType) -> Result<FileType, AppError> {
        validate_file_type_id(&new.id)?;
        validate_label(&new.label)?;
        validate_mimetypes(&new.mimetypes)?;

        let now = Utc::now();
        let mimetypes = serde_json::to_string(&new.mimetypes)?;

        let result = sqlx::query_as::<Sqlite, FileTypeRow>(&format!(
            "INSERT INTO file_types ({cols}) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {cols}",
            cols = FILE_TYPE_COLUMNS
        ))
        .bind(&new.id)
        .bind(new.label.trim())
        .bind(&new.description)
        .bind(&mimetypes)
        .bind(new.weight)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => {
                tracing::info!(file_type = %row.id, "File type created");
                row.try_into()
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Validation(format!("File type '{}' already exists", new.id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_types", db.operation = "select"))]
    pub async fn get(&self, id: &str) -> Result<FileType, AppError> {
        sqlx::query_as::<Sqlite, FileTypeRow>(&format!(
            "SELECT {} FROM file_types WHERE id = ?",
            FILE_TYPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File type '{}' not found", id)))?
        .try_into()
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_types", db.operation = "select"))]
    pub async fn exists(&self, id: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Sqlite, bool>(
            "SELECT EXISTS(SELECT 1 FROM file_types WHERE id = ?)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// All file types ordered by weight, then machine name
    #[tracing::instrument(skip(self), fields(db.table = "file_types", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<FileType>, AppError> {
        let rows = sqlx::query_as::<Sqlite, FileTypeRow>(&format!(
            "SELECT {} FROM file_types ORDER BY weight ASC, id ASC",
            FILE_TYPE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FileType::try_from).collect()
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "file_types", db.operation = "update"))]
    pub async fn update(&self, id: &str, update: FileTypeUpdate) -> Result<FileType, AppError> {
        let mut file_type = self.get(id).await?;

        if let Some(label) = update.label {
            validate_label(&label)?;
            file_type.label = label.trim().to_string();
        }
        if let Some(description) = update.description {
            file_type.description = description;
        }
        if let Some(mimetypes) = update.mimetypes {
            validate_mimetypes(&mimetypes)?;
            file_type.mimetypes = mimetypes;
        }
        if let Some(weight) = update.weight {
            file_type.weight = weight;
        }

        let row = sqlx::query_as::<Sqlite, FileTypeRow>(&format!(
            "UPDATE file_types SET label = ?, description = ?, mimetypes = ?, weight = ?, updated_at = ? \
             WHERE id = ? RETURNING {}",
            FILE_TYPE_COLUMNS
        ))
        .bind(&file_type.label)
        .bind(&file_type.description)
        .bind(serde_json::to_string(&file_type.mimetypes)?)
        .bind(file_type.weight)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File type '{}' not found", id)))?;

        row.try_into()
    }

    /// Delete a file type, moving every record of that type to `undefined`.
    ///
    /// Reassignment and deletion commit together. Returns the number of live
    /// records that were reassigned.
    #[tracing::instrument(skip(self), fields(db.table = "file_types", db.operation = "delete"))]
    pub async fn delete(&self, id: &str) -> Result<u64, AppError> {
        if id == UNDEFINED_FILE_TYPE {
            return Err(AppError::Validation(format!(
                "The '{}' file type cannot be deleted",
                UNDEFINED_FILE_TYPE
            )));
        }

        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<Sqlite, bool>(
            "SELECT EXISTS(SELECT 1 FROM file_types WHERE id = ?)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(AppError::NotFound(format!("File type '{}' not found", id)));
        }

        let live = sqlx::query_scalar::<Sqlite, i64>(
            "SELECT COUNT(*) FROM files WHERE file_type = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        // Soft-deleted rows are reassigned too so the foreign key stays valid
        sqlx::query("UPDATE files SET file_type = ?, updated_at = ? WHERE file_type = ?")
            .bind(UNDEFINED_FILE_TYPE)
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM file_types WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            file_type = %id,
            reassigned = live,
            "File type deleted, records moved to '{}'",
            UNDEFINED_FILE_TYPE
        );

        Ok(live as u64)
    }
}
