//! fentity Storage Library
//!
//! This crate provides the blob store abstraction used for file content.
//! It includes the `Storage` trait and implementations for the local
//! filesystem and an in-process memory map.
//!
//! # Storage key format
//!
//! - **Uploaded content**: `files/{file_id}/{filename}`
//! - **Staged replacements**: `{staging_prefix}/{file_id}/{staged_id}.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in
//! the `keys` module so every caller agrees on the layout.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use fentity_core::StorageBackend;
pub use keys::{file_key, staging_dir, staging_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
