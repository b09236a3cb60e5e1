//! Test helpers for service tests
//!
//! `FailingStorage` wraps an in-memory store and can be told to fail or stall
//! copies, or to fail size lookups. `RecordingAuditSink` keeps every audit event for assertions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fentity_core::hooks::{AuditSink, ReplacementEvent};
use fentity_storage::{
    ByteStream, MemoryStorage, Storage, StorageBackend, StorageError, StorageResult,
};

/// In-memory storage with switchable copy failures
#[derive(Clone, Default)]
pub struct FailingStorage {
    inner: MemoryStorage,
    fail_copies: Arc<AtomicBool>,
    fail_content_length: Arc<AtomicBool>,
    copy_delay: Arc<Mutex<Option<Duration>>>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    /// Make every following `copy` fail before touching the destination
    pub fn fail_copies(&self, fail: bool) {
        self.fail_copies.store(fail, Ordering::SeqCst);
    }

    /// Make every following `content_length` fail
    pub fn fail_content_length(&self, fail: bool) {
        self.fail_content_length.store(fail, Ordering::SeqCst);
    }

    /// Delay every following `copy` (None to disable)
    pub fn delay_copies(&self, delay: Option<Duration>) {
        *self.copy_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn write(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.inner.write(key, data).await
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.read(key).await
    }

    async fn read_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.read_stream(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let delay = *self.copy_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_copies.load(Ordering::SeqCst) {
            return Err(StorageError::CopyFailed(format!(
                "simulated failure copying {} to {}",
                from_key, to_key
            )));
        }
        self.inner.copy(from_key, to_key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        self.inner.delete_prefix(prefix).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn content_length(&self, key: &str) -> StorageResult<u64> {
        if self.fail_content_length.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError(format!(
                "simulated failure reading size of {}",
                key
            )));
        }
        self.inner.content_length(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Audit sink that keeps every event in memory
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<ReplacementEvent>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReplacementEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record_replacement(&self, event: ReplacementEvent) {
        self.events.lock().unwrap().push(event);
    }
}
