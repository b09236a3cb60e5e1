use fentity_core::models::{FileRecord, FileType};

use crate::classifier::ClassificationRule;

/// Routes files uploaded without an owner to a dedicated type
/// (e.g. an `untrusted` bundle). Runs before the other built-in rules by default.
#[derive(Debug, Clone)]
pub struct AnonymousUploadRule {
    file_type: String,
    weight: i32,
}

impl AnonymousUploadRule {
    pub const NAME: &'static str = "anonymous_upload";
    pub const DEFAULT_WEIGHT: i32 = -10;

    pub fn new(file_type: impl Into<String>) -> Self {
        Self {
            file_type: file_type.into(),
            weight: Self::DEFAULT_WEIGHT,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

impl ClassificationRule for AnonymousUploadRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn candidates(&self, record: &FileRecord, _file_types: &[FileType]) -> Vec<String> {
        if record.is_anonymous() {
            vec![self.file_type.clone()]
        } else {
            Vec::new()
        }
    }
}
