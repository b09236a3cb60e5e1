//! Search index entries built from file records

use std::collections::BTreeMap;

use fentity_core::models::FileRecord;
use fentity_plugins::IndexRegistry;

/// Builds index text and result extras through the registered contributors
#[derive(Clone)]
pub struct SearchIndexer {
    registry: IndexRegistry,
}

impl SearchIndexer {
    pub fn new(registry: IndexRegistry) -> Self {
        Self { registry }
    }

    /// Searchable text: file name, description, then contributor text in
    /// registration order, separated by single spaces
    pub async fn index_text(&self, record: &FileRecord) -> String {
        let mut parts = vec![record.filename.clone()];
        if let Some(description) = record.description.as_deref().map(str::trim) {
            if !description.is_empty() {
                parts.push(description.to_string());
            }
        }
        for contributor in self.registry.contributors().await {
            if let Some(text) = contributor.index_text(record) {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    /// Key/value pairs shown with a search result; a later contributor wins on
    /// a repeated key
    pub async fn result_extras(&self, record: &FileRecord) -> BTreeMap<String, String> {
        let mut extras = BTreeMap::new();
        for contributor in self.registry.contributors().await {
            extras.extend(contributor.result_extras(record));
        }
        extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fentity_plugins::test_helpers::sample_record;
    use fentity_plugins::{FileDetailsContributor, IndexContributor, MetadataIndexContributor};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Shadow;

    impl IndexContributor for Shadow {
        fn name(&self) -> &str {
            "shadow"
        }

        fn result_extras(&self, _record: &FileRecord) -> Vec<(String, String)> {
            vec![("type".to_string(), "shadowed".to_string())]
        }
    }

    async fn indexer() -> SearchIndexer {
        let registry = IndexRegistry::new();
        registry
            .register(Arc::new(MetadataIndexContributor))
            .await
            .unwrap();
        registry
            .register(Arc::new(FileDetailsContributor))
            .await
            .unwrap();
        SearchIndexer::new(registry)
    }

    #[tokio::test]
    async fn test_index_text_joins_name_description_and_metadata() {
        let indexer = indexer().await;
        let mut record = sample_record();
        record.description = Some("Quarterly numbers".to_string());
        record.metadata.insert("author".to_string(), json!("Ada"));
        record.metadata.insert("pages".to_string(), json!(12));

        let text = indexer.index_text(&record).await;
        assert_eq!(text, format!("{} Quarterly numbers Ada", record.filename));
    }

    #[tokio::test]
    async fn test_later_contributor_wins_on_extras() {
        let indexer = indexer().await;
        let record = sample_record();
        assert_eq!(
            indexer.result_extras(&record).await.get("type").map(String::as_str),
            Some(record.file_type.as_str())
        );

        indexer.registry.register(Arc::new(Shadow)).await.unwrap();
        let extras = indexer.result_extras(&record).await;
        assert_eq!(extras.get("type").map(String::as_str), Some("shadowed"));
        assert!(extras.contains_key("mime"));
    }
}
