//! Classification rule and override stage traits
//!
//! A rule looks at a record and proposes candidate type ids. Once every rule
//! has run, override stages may rewrite the concatenated candidate list or
//! pick one entry from it.

use std::fmt::Debug;

use fentity_core::models::{FileRecord, FileType};
use serde::Serialize;

/// Trait that all classification rules must implement
pub trait ClassificationRule: Send + Sync + Debug {
    /// Unique rule name
    fn name(&self) -> &str;

    /// Lower weights run first; ties keep registration order
    fn weight(&self) -> i32 {
        0
    }

    /// Candidate type ids for `record`, most preferred first.
    ///
    /// `file_types` is the known type list ordered by weight then id.
    fn candidates(&self, record: &FileRecord, file_types: &[FileType]) -> Vec<String>;
}

/// Decision of an override stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOverride {
    /// Leave the candidate list as it is
    Keep,
    /// Replace the whole candidate list
    Replace(Vec<String>),
    /// Keep only the candidate at this index
    Select(usize),
}

/// Second pass allowed to rewrite the candidate sequence
pub trait OverrideStage: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn weight(&self) -> i32 {
        0
    }

    fn apply(&self, record: &FileRecord, candidates: &[String]) -> CandidateOverride;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Rule,
    Override,
}

/// Registry listing entry
#[derive(Debug, Clone, Serialize)]
pub struct StageInfo {
    pub name: String,
    pub kind: StageKind,
    pub weight: i32,
}
