use fentity_core::models::{FileRecord, FileType};

use crate::classifier::ClassificationRule;

/// Proposes every type whose MIME patterns accept the record's MIME type,
/// in the order of the supplied type list.
#[derive(Debug, Clone, Default)]
pub struct MimeTypeRule {
    weight: i32,
}

impl MimeTypeRule {
    pub const NAME: &'static str = "mime_type";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(weight: i32) -> Self {
        Self { weight }
    }
}

impl ClassificationRule for MimeTypeRule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn candidates(&self, record: &FileRecord, file_types: &[FileType]) -> Vec<String> {
        file_types
            .iter()
            .filter(|file_type| !file_type.is_undefined() && file_type.matches_mime(&record.filemime))
            .map(|file_type| file_type.id.clone())
            .collect()
    }
}
