//! Test helpers for classifier and index tests
//!
//! Fixtures and fixed-answer stages so registries can be exercised without a
//! database.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use fentity_core::models::{FileRecord, FileStatus, FileType};
use uuid::Uuid;

use crate::classifier::{CandidateOverride, ClassificationRule, OverrideStage};

/// A permanent, owned PDF record
pub fn sample_record() -> FileRecord {
    let now = Utc::now();
    FileRecord {
        id: Uuid::new_v4(),
        uri: "files/sample/report.pdf".to_string(),
        filename: "report.pdf".to_string(),
        filemime: "application/pdf".to_string(),
        filesize: 2048,
        status: FileStatus::Permanent,
        file_type: "undefined".to_string(),
        owner_id: Some(Uuid::new_v4()),
        description: None,
        metadata: BTreeMap::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_type(id: &str, mimetypes: &[&str]) -> FileType {
    let now = Utc::now();
    FileType {
        id: id.to_string(),
        label: id.to_string(),
        description: String::new(),
        mimetypes: mimetypes.iter().map(|m| m.to_string()).collect(),
        weight: 0,
        created_at: now,
        updated_at: now,
    }
}

/// Rule that always proposes the same candidates
#[derive(Debug)]
pub struct StaticRule {
    name: String,
    weight: i32,
    candidates: Vec<String>,
}

impl StaticRule {
    pub fn arc(name: &str, weight: i32, candidates: &[&str]) -> Arc<dyn ClassificationRule> {
        Arc::new(Self {
            name: name.to_string(),
            weight,
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        })
    }
}

impl ClassificationRule for StaticRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn candidates(&self, _record: &FileRecord, _file_types: &[FileType]) -> Vec<String> {
        self.candidates.clone()
    }
}

/// Override stage that always returns the same decision
#[derive(Debug)]
pub struct StaticOverride {
    name: String,
    weight: i32,
    decision: CandidateOverride,
}

impl StaticOverride {
    pub fn arc(name: &str, weight: i32, decision: CandidateOverride) -> Arc<dyn OverrideStage> {
        Arc::new(Self {
            name: name.to_string(),
            weight,
            decision,
        })
    }
}

impl OverrideStage for StaticOverride {
    fn name(&self) -> &str {
        &self.name
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn apply(&self, _record: &FileRecord, _candidates: &[String]) -> CandidateOverride {
        self.decision.clone()
    }
}
