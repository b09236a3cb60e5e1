//! Display formatter registry
//!
//! Formatters describe how a file can be rendered: a machine name, a label,
//! the MIME types they apply to and their default settings. Rendering itself
//! lives outside this crate; the registry only answers which formatters exist
//! and which ones fit a given record. Registered entries can be altered after
//! the fact, e.g. to change a label or narrow the MIME types.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{bail, Result};
use fentity_core::models::{mime_pattern_matches, FileRecord};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::RwLock;

/// Trait that all file formatters must implement
pub trait FileFormatter: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn label(&self) -> &str;

    /// MIME patterns this formatter handles; empty means every type
    fn mime_types(&self) -> Vec<String> {
        Vec::new()
    }

    fn default_settings(&self) -> BTreeMap<String, JsonValue> {
        BTreeMap::new()
    }
}

/// Registered description of a formatter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatterInfo {
    pub name: String,
    pub label: String,
    pub mime_types: Vec<String>,
    pub default_settings: BTreeMap<String, JsonValue>,
}

impl FormatterInfo {
    pub fn applies_to(&self, mime: &str) -> bool {
        self.mime_types.is_empty()
            || self
                .mime_types
                .iter()
                .any(|pattern| mime_pattern_matches(pattern, mime))
    }
}

impl From<&dyn FileFormatter> for FormatterInfo {
    fn from(formatter: &dyn FileFormatter) -> Self {
        Self {
            name: formatter.name().to_string(),
            label: formatter.label().to_string(),
            mime_types: formatter.mime_types(),
            default_settings: formatter.default_settings(),
        }
    }
}

/// Formatter descriptions in registration order
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    formatters: Arc<RwLock<Vec<FormatterInfo>>>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, formatter: Arc<dyn FileFormatter>) -> Result<()> {
        let info = FormatterInfo::from(formatter.as_ref());
        let mut formatters = self.formatters.write().await;
        if formatters.iter().any(|f| f.name == info.name) {
            bail!("Formatter '{}' is already registered", info.name);
        }
        tracing::debug!(formatter = %info.name, "Registered file formatter");
        formatters.push(info);
        Ok(())
    }

    /// Change a registered formatter's description in place
    pub async fn alter<F>(&self, name: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut FormatterInfo),
    {
        let mut formatters = self.formatters.write().await;
        let Some(info) = formatters.iter_mut().find(|f| f.name == name) else {
            bail!("Formatter '{}' is not registered", name);
        };
        let mut altered = info.clone();
        change(&mut altered);
        if altered.name != name {
            bail!("Formatter '{}' cannot be renamed", name);
        }
        *info = altered;
        Ok(())
    }

    pub async fn unregister(&self, name: &str) -> bool {
        let mut formatters = self.formatters.write().await;
        let before = formatters.len();
        formatters.retain(|f| f.name != name);
        formatters.len() != before
    }

    pub async fn get(&self, name: &str) -> Option<FormatterInfo> {
        self.formatters
            .read()
            .await
            .iter()
            .find(|f| f.name == name)
            .cloned()
    }

    pub async fn list(&self) -> Vec<FormatterInfo> {
        self.formatters.read().await.clone()
    }

    /// Formatters that can display `record`, in registration order
    pub async fn formatters_for(&self, record: &FileRecord) -> Vec<FormatterInfo> {
        self.formatters
            .read()
            .await
            .iter()
            .filter(|f| f.applies_to(&record.filemime))
            .cloned()
            .collect()
    }
}

/// Link to the file, usable for any MIME type
#[derive(Debug, Clone, Default)]
pub struct GenericFileFormatter;

impl GenericFileFormatter {
    pub const NAME: &'static str = "file_field_file_default";
}

impl FileFormatter for GenericFileFormatter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn label(&self) -> &str {
        "Generic file"
    }
}

/// Inline image with an optional style
#[derive(Debug, Clone, Default)]
pub struct ImageFormatter;

impl ImageFormatter {
    pub const NAME: &'static str = "file_image";
}

impl FileFormatter for ImageFormatter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn label(&self) -> &str {
        "Image"
    }

    fn mime_types(&self) -> Vec<String> {
        vec!["image/*".to_string()]
    }

    fn default_settings(&self) -> BTreeMap<String, JsonValue> {
        [
            ("image_style".to_string(), json!("")),
            ("alt".to_string(), json!("")),
            ("title".to_string(), json!("")),
        ]
        .into_iter()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_record;

    async fn registry() -> FormatterRegistry {
        let registry = FormatterRegistry::new();
        registry.register(Arc::new(GenericFileFormatter)).await.unwrap();
        registry.register(Arc::new(ImageFormatter)).await.unwrap();
        registry
    }

    #[tokio::test]
    async fn test_duplicate_formatter_rejected() {
        let registry = registry().await;
        assert!(registry.register(Arc::new(ImageFormatter)).await.is_err());
        assert_eq!(registry.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_formatters_for_filters_by_mime() {
        let registry = registry().await;
        let mut record = sample_record();

        let names: Vec<String> = registry
            .formatters_for(&record)
            .await
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec![GenericFileFormatter::NAME]);

        record.filemime = "image/png".to_string();
        let names: Vec<String> = registry
            .formatters_for(&record)
            .await
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec![GenericFileFormatter::NAME, ImageFormatter::NAME]);
    }

    #[tokio::test]
    async fn test_alter_changes_registered_info() {
        let registry = registry().await;
        registry
            .alter(ImageFormatter::NAME, |info| {
                info.label = "Picture".to_string();
                info.mime_types = vec!["image/jpeg".to_string()];
                info.default_settings
                    .insert("image_style".to_string(), json!("thumbnail"));
            })
            .await
            .unwrap();

        let info = registry.get(ImageFormatter::NAME).await.unwrap();
        assert_eq!(info.label, "Picture");
        assert!(info.applies_to("image/jpeg"));
        assert!(!info.applies_to("image/png"));
        assert_eq!(info.default_settings["image_style"], json!("thumbnail"));

        assert!(registry.alter("missing", |_| {}).await.is_err());
        assert!(registry
            .alter(ImageFormatter::NAME, |info| info.name = "other".to_string())
            .await
            .is_err());
        assert!(registry.get(ImageFormatter::NAME).await.is_some());
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = registry().await;
        assert!(registry.unregister(GenericFileFormatter::NAME).await);
        assert!(!registry.unregister(GenericFileFormatter::NAME).await);
        assert!(registry.get(GenericFileFormatter::NAME).await.is_none());
    }
}
