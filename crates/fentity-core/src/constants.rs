//! Shared constants

/// Sentinel file type assigned when no classification rule matches.
pub const UNDEFINED_FILE_TYPE: &str = "undefined";

/// Human label of the sentinel type, seeded by the initial migration.
pub const UNDEFINED_FILE_TYPE_LABEL: &str = "Undefined";

/// Storage key prefix for uploaded file content.
pub const FILES_PREFIX: &str = "files";

/// Default storage key prefix for staged replacement uploads.
pub const DEFAULT_STAGING_PREFIX: &str = "staging";

/// Version written into every interchange document.
pub const INTERCHANGE_FORMAT_VERSION: u32 = 1;

/// Upper bound on rows returned by a single list query.
pub const MAX_LIST_LIMIT: i64 = 500;
