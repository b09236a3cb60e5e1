//! Test helpers: wire `Services` over an in-memory database.
//!
//! Run from workspace root: `cargo test -p fentity-services`.

#![allow(dead_code)]

use std::sync::Arc;

use fentity_core::models::FileRecord;
use fentity_core::Config;
use fentity_services::test_helpers::{FailingStorage, RecordingAuditSink};
use fentity_services::{Services, UploadRequest};
use fentity_storage::{LocalStorage, MemoryStorage};
use tempfile::TempDir;

/// Services plus handles on the fakes behind them
pub struct TestApp {
    pub services: Services,
    pub storage: Arc<FailingStorage>,
    pub audit: Arc<RecordingAuditSink>,
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Config::default()).await
}

pub async fn setup_test_app_with(config: Config) -> TestApp {
    let storage = Arc::new(FailingStorage::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let services = Services::in_memory_with_audit(config, storage.clone(), audit.clone())
        .await
        .expect("Failed to build services");
    TestApp {
        services,
        storage,
        audit,
    }
}

/// Services over plain memory storage, no fault injection
pub async fn setup_memory_services() -> (Services, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let services = Services::in_memory(Config::default(), storage.clone())
        .await
        .expect("Failed to build services");
    (services, storage)
}

/// Services over a local directory; keep the `TempDir` alive for the test
pub async fn setup_local_services() -> (Services, Arc<LocalStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = Arc::new(
        LocalStorage::new(temp_dir.path())
            .await
            .expect("Failed to create local storage"),
    );
    let services = Services::in_memory(Config::default(), storage.clone())
        .await
        .expect("Failed to build services");
    (services, storage, temp_dir)
}

pub async fn upload(services: &Services, filename: &str, mime: &str, data: &[u8]) -> FileRecord {
    services
        .files
        .upload(UploadRequest::new(filename, mime, data.to_vec()))
        .await
        .expect("Upload failed")
}
