//! Search index contributors
//!
//! Contributors add text to a record's index entry and extra key/value pairs
//! to its search result. Ranking happens elsewhere.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{bail, Result};
use fentity_core::models::FileRecord;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;

/// Trait that all index contributors must implement
pub trait IndexContributor: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Extra searchable text for `record`
    fn index_text(&self, _record: &FileRecord) -> Option<String> {
        None
    }

    /// Extra key/value pairs shown with a search result
    fn result_extras(&self, _record: &FileRecord) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Ordered collection of index contributors
#[derive(Clone, Default)]
pub struct IndexRegistry {
    contributors: Arc<RwLock<Vec<Arc<dyn IndexContributor>>>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, contributor: Arc<dyn IndexContributor>) -> Result<()> {
        let mut contributors = self.contributors.write().await;
        if contributors.iter().any(|c| c.name() == contributor.name()) {
            bail!("Index contributor '{}' is already registered", contributor.name());
        }
        contributors.push(contributor);
        Ok(())
    }

    /// Snapshot of the contributors in registration order
    pub async fn contributors(&self) -> Vec<Arc<dyn IndexContributor>> {
        self.contributors.read().await.clone()
    }

    pub async fn names(&self) -> Vec<String> {
        self.contributors
            .read()
            .await
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }
}

/// Indexes the string values of a record's metadata
#[derive(Debug, Clone, Default)]
pub struct MetadataIndexContributor;

impl MetadataIndexContributor {
    pub const NAME: &'static str = "metadata";
}

impl IndexContributor for MetadataIndexContributor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn index_text(&self, record: &FileRecord) -> Option<String> {
        let text = record
            .metadata
            .values()
            .filter_map(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!text.is_empty()).then_some(text)
    }
}

/// Adds type, MIME type and a readable size to search results
#[derive(Debug, Clone, Default)]
pub struct FileDetailsContributor;

impl FileDetailsContributor {
    pub const NAME: &'static str = "file_details";
}

impl IndexContributor for FileDetailsContributor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn result_extras(&self, record: &FileRecord) -> Vec<(String, String)> {
        let extras: BTreeMap<&str, String> = [
            ("type", record.file_type.clone()),
            ("mime", record.filemime.clone()),
            ("size", format_size(record.filesize)),
        ]
        .into_iter()
        .collect();
        extras
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}
