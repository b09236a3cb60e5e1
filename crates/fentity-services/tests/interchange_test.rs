//! Export/import integration tests.
//!
//! Run with: `cargo test -p fentity-services --test interchange_test`

mod helpers;

use std::collections::BTreeMap;

use fentity_core::models::{FileStatus, NewFileType};
use fentity_core::AppError;
use fentity_services::{InterchangeService, UploadRequest};
use fentity_storage::Storage;
use helpers::{setup_local_services, setup_memory_services};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_export_delete_import_roundtrip() {
    let (services, storage) = setup_memory_services().await;
    services
        .file_types
        .create(NewFileType::new("document", "Document").with_mimetypes(["application/pdf"]))
        .await
        .unwrap();

    let mut metadata = BTreeMap::new();
    metadata.insert("pages".to_string(), json!(3));
    let content = b"%PDF-1.7 binary \x00\x01\x02".to_vec();
    let original = services
        .files
        .upload(
            UploadRequest::new("contract.pdf", "application/pdf", content.clone())
                .with_owner(Uuid::new_v4())
                .with_status(FileStatus::Temporary)
                .with_description("Signed contract")
                .with_metadata(metadata),
        )
        .await
        .unwrap();
    assert_eq!(original.file_type, "document");

    let doc = services.interchange.export_record(original.id).await.unwrap();
    let json = InterchangeService::to_json(&doc).unwrap();

    services.files.delete(original.id).await.unwrap();
    assert!(!storage.exists(&original.uri).await.unwrap());

    let parsed = InterchangeService::from_json(&json).unwrap();
    let imported = services.interchange.import_record(parsed).await.unwrap();

    assert_ne!(imported.id, original.id);
    assert_eq!(imported.uri, original.uri);
    assert_eq!(imported.filename, original.filename);
    assert_eq!(imported.filemime, original.filemime);
    assert_eq!(imported.filesize, original.filesize);
    assert_eq!(imported.status, FileStatus::Temporary);
    assert_eq!(imported.file_type, "document");
    assert_eq!(imported.owner_id, original.owner_id);
    assert_eq!(imported.description.as_deref(), Some("Signed contract"));
    assert_eq!(imported.metadata, original.metadata);
    assert_eq!(imported.created_at, original.created_at);
    assert_eq!(storage.read(&imported.uri).await.unwrap(), content);
}

#[tokio::test]
async fn test_import_unknown_type_writes_nothing() {
    let (services, storage) = setup_memory_services().await;
    services
        .file_types
        .create(NewFileType::new("image", "Image").with_mimetypes(["image/*"]))
        .await
        .unwrap();
    let original = services
        .files
        .upload(UploadRequest::new("cat.png", "image/png", vec![1, 2, 3]))
        .await
        .unwrap();
    let doc = services.interchange.export_record(original.id).await.unwrap();
    services.files.delete(original.id).await.unwrap();
    services.file_types.delete("image").await.unwrap();

    let result = services.interchange.import_record(doc).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_export_missing_record_is_not_found() {
    let (services, _) = setup_memory_services().await;
    assert!(matches!(
        services.interchange.export_record(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_roundtrip_on_local_storage() {
    let (services, storage, _temp_dir) = setup_local_services().await;
    let original = services
        .files
        .upload(UploadRequest::new("notes.md", "text/markdown", b"# Notes\n".to_vec()))
        .await
        .unwrap();

    let doc = services.interchange.export_record(original.id).await.unwrap();
    services.files.delete(original.id).await.unwrap();

    let imported = services.interchange.import_record(doc).await.unwrap();
    assert_eq!(imported.uri, original.uri);
    assert_eq!(storage.read(&imported.uri).await.unwrap(), b"# Notes\n".to_vec());
}
