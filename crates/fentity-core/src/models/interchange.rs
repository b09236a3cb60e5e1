use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::file::FileStatus;

/// Portable representation of a file record and its content.
///
/// The record id is intentionally absent: importing assigns a fresh id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeDoc {
    pub format_version: u32,
    pub uri: String,
    pub filename: String,
    pub filemime: String,
    pub filesize: i64,
    pub status: FileStatus,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
    pub created_at: DateTime<Utc>,
    /// Base64 (standard alphabet, padded) encoding of the file bytes
    pub content: String,
}
