use crate::traits::{check_key, ByteStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file content (e.g., "/var/lib/fentity/files")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Keys with traversal sequences or an absolute prefix are rejected, and a
    /// key whose existing target resolves outside the base directory (through a
    /// symlink) is rejected as well.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        check_key(key)?;

        let path = self.base_path.join(key);

        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
            })?;
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Sibling path used to build new content before it is renamed into place
    fn temp_path_for(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4()))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn copy_until(
        &self,
        from_key: &str,
        to_key: &str,
        deadline: Option<Instant>,
    ) -> StorageResult<()> {
        let from_path = self.key_to_path(from_key)?;
        let to_path = self.key_to_path(to_key)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from_key.to_string()));
        }

        self.ensure_parent_dir(&to_path).await?;

        // Deadline checks happen inside the task; it is awaited to completion.
        let (from, to) = (from_path.clone(), to_path.clone());
        tokio::task::spawn_blocking(move || copy_file_until(&from, &to, deadline))
            .await
            .map_err(|e| StorageError::BackendError(format!("Copy task failed: {}", e)))??;

        tracing::info!(
            from_key = %from_key,
            to_key = %to_key,
            from_path = %from_path.display(),
            to_path = %to_path.display(),
            "Local storage copy successful"
        );

        Ok(())
    }

    /// Write `data` to a temp file next to `path`, then rename it over `path`
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let temp = Self::temp_path_for(path);

        let result = async {
            let mut file = fs::File::create(&temp).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create file {}: {}",
                    temp.display(),
                    e
                ))
            })?;
            file.write_all(data).await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to write file {}: {}", temp.display(), e))
            })?;
            file.sync_all().await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to sync file {}: {}", temp.display(), e))
            })?;
            fs::rename(&temp, path).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to move {} into place: {}",
                    path.display(),
                    e
                ))
            })
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&temp).await;
        }
        result
    }
}

const COPY_CHUNK_SIZE: usize = 64 * 1024;

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Copy `from` into a temp file next to `to` and rename it over `to`.
///
/// The deadline is checked before the first chunk, after every chunk and right
/// before the rename. Any failure removes the temp file and leaves `to` as it was.
fn copy_file_until(from: &Path, to: &Path, deadline: Option<Instant>) -> StorageResult<()> {
    let timed_out = || {
        StorageError::Timeout(format!(
            "copy of {} to {} passed its deadline",
            from.display(),
            to.display()
        ))
    };
    if deadline_passed(deadline) {
        return Err(timed_out());
    }

    let temp = LocalStorage::temp_path_for(to);
    let result = (|| -> StorageResult<()> {
        let mut reader = std::fs::File::open(from).map_err(|e| {
            StorageError::CopyFailed(format!("Failed to open {}: {}", from.display(), e))
        })?;
        let mut writer = std::fs::File::create(&temp)?;
        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).map_err(|e| {
                StorageError::CopyFailed(format!("Failed to read {}: {}", from.display(), e))
            })?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n])?;
            if deadline_passed(deadline) {
                return Err(timed_out());
            }
        }
        writer.sync_all()?;
        drop(writer);

        if deadline_passed(deadline) {
            return Err(timed_out());
        }
        std::fs::rename(&temp, to).map_err(|e| {
            StorageError::CopyFailed(format!(
                "Failed to move copy into place at {}: {}",
                to.display(),
                e
            ))
        })
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp);
    }
    result
}

#[async_trait]
impl Storage for LocalStorage {
    async fn write(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = Instant::now();
        self.write_atomic(&path, &data).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(())
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        let start = Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    async fn read_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let key = key.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Local storage stream read error");
                StorageError::ReadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        self.copy_until(from_key, to_key, None).await
    }

    async fn copy_within(
        &self,
        from_key: &str,
        to_key: &str,
        deadline: Instant,
    ) -> StorageResult<()> {
        self.copy_until(from_key, to_key, Some(deadline)).await
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let path = self.key_to_path(prefix.trim_end_matches('/'))?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_dir_all(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!(
                "Failed to delete directory {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::info!(path = %path.display(), prefix = %prefix, "Local storage prefix deleted");

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn content_length(&self, key: &str) -> StorageResult<u64> {
        let path = self.key_to_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
