use std::collections::BTreeMap;

use fentity_core::models::{FileRecord, FileType};

use crate::classifier::ClassificationRule;

/// Maps lowercase file extensions to type ids
#[derive(Debug, Clone)]
pub struct ExtensionRule {
    mapping: BTreeMap<String, String>,
    weight: i32,
}

impl ExtensionRule {
    pub const NAME: &'static str = "extension";
    pub const DEFAULT_WEIGHT: i32 = 10;

    pub fn new() -> Self {
        Self {
            mapping: BTreeMap::new(),
            weight: Self::DEFAULT_WEIGHT,
        }
    }

    /// Map `extension` (with or without the leading dot) to `file_type`
    pub fn map(mut self, extension: &str, file_type: impl Into<String>) -> Self {
        let extension = extension.trim_start_matches('.').to_lowercase();
        self.mapping.insert(extension, file_type.into());
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

impl Default for ExtensionRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassificationRule for ExtensionRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn candidates(&self, record: &FileRecord, _file_types: &[FileType]) -> Vec<String> {
        record
            .extension()
            .and_then(|ext| self.mapping.get(&ext).cloned())
            .into_iter()
            .collect()
    }
}
