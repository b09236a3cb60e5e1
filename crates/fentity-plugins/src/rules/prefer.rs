use fentity_core::models::FileRecord;

use crate::classifier::{CandidateOverride, OverrideStage};

/// Moves a configured type to the front of the candidate list when present
#[derive(Debug, Clone)]
pub struct PreferTypeOverride {
    file_type: String,
    weight: i32,
}

impl PreferTypeOverride {
    pub const NAME: &'static str = "prefer_type";

    pub fn new(file_type: impl Into<String>) -> Self {
        Self {
            file_type: file_type.into(),
            weight: 0,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

impl OverrideStage for PreferTypeOverride {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn apply(&self, _record: &FileRecord, candidates: &[String]) -> CandidateOverride {
        match candidates.iter().position(|c| *c == self.file_type) {
            None | Some(0) => CandidateOverride::Keep,
            Some(index) => {
                let mut reordered = candidates.to_vec();
                let preferred = reordered.remove(index);
                reordered.insert(0, preferred);
                CandidateOverride::Replace(reordered)
            }
        }
    }
}

/// Always picks the candidate at a fixed position
#[derive(Debug, Clone)]
pub struct PickIndexOverride {
    name: String,
    index: usize,
    weight: i32,
}

impl PickIndexOverride {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            weight: 0,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

impl OverrideStage for PickIndexOverride {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn apply(&self, _record: &FileRecord, _candidates: &[String]) -> CandidateOverride {
        CandidateOverride::Select(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_record;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prefer_moves_type_to_front() {
        let stage = PreferTypeOverride::new("document");
        let record = sample_record();

        assert_eq!(
            stage.apply(&record, &list(&["image", "video", "document"])),
            CandidateOverride::Replace(list(&["document", "image", "video"]))
        );
        assert_eq!(stage.apply(&record, &list(&["document", "image"])), CandidateOverride::Keep);
        assert_eq!(stage.apply(&record, &list(&["image"])), CandidateOverride::Keep);
    }

    #[test]
    fn test_pick_index_always_selects() {
        let stage = PickIndexOverride::new("pick_fifth", 4);
        assert_eq!(stage.apply(&sample_record(), &[]), CandidateOverride::Select(4));
    }
}
