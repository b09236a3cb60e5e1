//! fentity Services Layer
//!
//! This crate hosts the business services built on the repositories, the blob
//! store and the plugin registries: type classification, the replacement
//! workflow, export/import, file actions and search indexing. Every
//! collaborator is passed in at construction; nothing is looked up globally.

pub mod actions;
pub mod file_types;
pub mod files;
pub mod interchange;
pub mod replacement;
pub mod search;
pub mod setup;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use actions::{
    ActionCommand, ActionReport, ActionTargetResult, ActionRegistry, DeleteFileAction, FileAction,
    SetStatusAction,
};
pub use file_types::FileTypeService;
pub use files::{FileService, UploadRequest};
pub use interchange::InterchangeService;
pub use replacement::{ReplacementState, ReplacementUpload, ReplacementWorkflow, StagedReplacement};
pub use search::SearchIndexer;
pub use setup::Services;

use std::sync::Arc;

use fentity_db::KeyedLocks;
use uuid::Uuid;

/// Per-record lock table shared by every service that mutates records
pub type RecordLocks = Arc<KeyedLocks<Uuid>>;

/// Per-locator lock table guarding content swaps
pub type LocatorLocks = Arc<KeyedLocks<String>>;
