//! fentity Core Library
//!
//! This crate provides the domain models, error types, configuration, hooks and
//! validation shared by every fentity component.

pub mod config;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{
    AuditSink, NoOpAuditSink, ReplacementEvent, ReplacementOutcome, TracingAuditSink,
};
pub use storage_types::StorageBackend;
// Note: Storage, StorageError, StorageResult live in fentity-storage
