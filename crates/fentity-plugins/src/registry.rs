//! Classifier registry holding rules and override stages

use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

use fentity_core::constants::UNDEFINED_FILE_TYPE;
use fentity_core::models::{FileRecord, FileType};
use fentity_core::AppError;

use crate::classifier::{
    CandidateOverride, ClassificationRule, OverrideStage, StageInfo, StageKind,
};

struct Registered<T: ?Sized> {
    weight: i32,
    seq: u64,
    item: Arc<T>,
}

#[derive(Default)]
struct RegistryState {
    rules: Vec<Registered<dyn ClassificationRule>>,
    overrides: Vec<Registered<dyn OverrideStage>>,
    next_seq: u64,
}

impl RegistryState {
    fn name_taken(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.item.name() == name)
            || self.overrides.iter().any(|o| o.item.name() == name)
    }
}

/// Registry for classification rules and override stages.
///
/// Rules and stages are evaluated ordered by `(weight, registration sequence)`,
/// so the outcome never depends on map iteration order. Classification only
/// takes the read lock; registration is serialized behind the write lock.
#[derive(Clone, Default)]
pub struct ClassifierRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl ClassifierRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a classification rule. Names must be unique across rules and stages.
    pub async fn register_rule(&self, rule: Arc<dyn ClassificationRule>) -> Result<()> {
        let mut state = self.state.write().await;
        if state.name_taken(rule.name()) {
            bail!("Classifier stage '{}' is already registered", rule.name());
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        tracing::debug!(rule = rule.name(), weight = rule.weight(), "Registering classification rule");
        state.rules.push(Registered {
            weight: rule.weight(),
            seq,
            item: rule,
        });
        state.rules.sort_by_key(|r| (r.weight, r.seq));
        Ok(())
    }

    /// Register an override stage. Names must be unique across rules and stages.
    pub async fn register_override(&self, stage: Arc<dyn OverrideStage>) -> Result<()> {
        let mut state = self.state.write().await;
        if state.name_taken(stage.name()) {
            bail!("Classifier stage '{}' is already registered", stage.name());
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        tracing::debug!(stage = stage.name(), weight = stage.weight(), "Registering override stage");
        state.overrides.push(Registered {
            weight: stage.weight(),
            seq,
            item: stage,
        });
        state.overrides.sort_by_key(|o| (o.weight, o.seq));
        Ok(())
    }

    /// Remove a rule or stage by name. Returns whether anything was removed.
    pub async fn unregister(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        let before = state.rules.len() + state.overrides.len();
        state.rules.retain(|r| r.item.name() != name);
        state.overrides.retain(|o| o.item.name() != name);
        before != state.rules.len() + state.overrides.len()
    }

    /// Rules then override stages, each in evaluation order
    pub async fn list(&self) -> Vec<StageInfo> {
        let state = self.state.read().await;
        state
            .rules
            .iter()
            .map(|r| StageInfo {
                name: r.item.name().to_string(),
                kind: StageKind::Rule,
                weight: r.weight,
            })
            .chain(state.overrides.iter().map(|o| StageInfo {
                name: o.item.name().to_string(),
                kind: StageKind::Override,
                weight: o.weight,
            }))
            .collect()
    }

    /// Candidate list after every rule and override stage has run
    pub async fn candidates(
        &self,
        record: &FileRecord,
        file_types: &[FileType],
    ) -> Result<Vec<String>, AppError> {
        let state = self.state.read().await;

        let mut candidates: Vec<String> = Vec::new();
        for rule in &state.rules {
            let proposed = rule.item.candidates(record, file_types);
            if !proposed.is_empty() {
                tracing::trace!(rule = rule.item.name(), ?proposed, "Rule proposed candidates");
                candidates.extend(proposed);
            }
        }

        for stage in &state.overrides {
            match stage.item.apply(record, &candidates) {
                CandidateOverride::Keep => {}
                CandidateOverride::Replace(replacement) => {
                    tracing::trace!(stage = stage.item.name(), ?replacement, "Override replaced candidates");
                    candidates = replacement;
                }
                CandidateOverride::Select(index) => {
                    let Some(selected) = candidates.get(index).cloned() else {
                        return Err(AppError::Validation(format!(
                            "Override stage '{}' selected candidate {} but only {} candidates exist",
                            stage.item.name(),
                            index,
                            candidates.len()
                        )));
                    };
                    candidates = vec![selected];
                }
            }
        }

        Ok(candidates)
    }

    /// Type id for `record`: the first candidate, or `undefined` when none remain
    pub async fn classify(
        &self,
        record: &FileRecord,
        file_types: &[FileType],
    ) -> Result<String, AppError> {
        let file_type = self
            .candidates(record, file_types)
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| UNDEFINED_FILE_TYPE.to_string());

        tracing::debug!(file_id = %record.id, file_type = %file_type, "File classified");
        Ok(file_type)
    }
}
