//! Bulk file actions
//!
//! An action runs once per target; a failing target never stops the others.
//! The returned report lists the outcome for every target in input order.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use fentity_core::models::FileStatus;
use fentity_core::AppError;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::files::FileService;

/// A request to run `action` against `targets`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCommand {
    pub action: String,
    pub targets: Vec<Uuid>,
}

impl ActionCommand {
    pub fn new(action: impl Into<String>, targets: Vec<Uuid>) -> Self {
        Self {
            action: action.into(),
            targets,
        }
    }
}

/// Trait that all file actions must implement
#[async_trait]
pub trait FileAction: Send + Sync {
    /// Machine name, e.g. `file_delete_action`
    fn name(&self) -> &str;

    fn label(&self) -> &str;

    async fn execute(&self, file_id: Uuid) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionTargetResult {
    pub file_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub action: String,
    pub results: Vec<ActionTargetResult>,
}

impl ActionReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Deletes the record and its content
pub struct DeleteFileAction {
    files: FileService,
}

impl DeleteFileAction {
    pub const NAME: &'static str = "file_delete_action";

    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}

#[async_trait]
impl FileAction for DeleteFileAction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn label(&self) -> &str {
        "Delete file"
    }

    async fn execute(&self, file_id: Uuid) -> Result<(), AppError> {
        self.files.delete(file_id).await.map(|_| ())
    }
}

/// Moves the record to a fixed status
pub struct SetStatusAction {
    files: FileService,
    status: FileStatus,
}

impl SetStatusAction {
    pub const PERMANENT: &'static str = "file_permanent_action";
    pub const TEMPORARY: &'static str = "file_temporary_action";

    pub fn permanent(files: FileService) -> Self {
        Self {
            files,
            status: FileStatus::Permanent,
        }
    }

    pub fn temporary(files: FileService) -> Self {
        Self {
            files,
            status: FileStatus::Temporary,
        }
    }
}

#[async_trait]
impl FileAction for SetStatusAction {
    fn name(&self) -> &str {
        match self.status {
            FileStatus::Permanent => Self::PERMANENT,
            FileStatus::Temporary => Self::TEMPORARY,
        }
    }

    fn label(&self) -> &str {
        match self.status {
            FileStatus::Permanent => "Make file permanent",
            FileStatus::Temporary => "Make file temporary",
        }
    }

    async fn execute(&self, file_id: Uuid) -> Result<(), AppError> {
        self.files.set_status(file_id, self.status).await.map(|_| ())
    }
}

/// Registry of actions keyed by name
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: Arc<RwLock<HashMap<String, Arc<dyn FileAction>>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the delete and status actions
    pub async fn register_builtin(&self, files: &FileService) -> Result<()> {
        self.register(Arc::new(DeleteFileAction::new(files.clone())))
            .await?;
        self.register(Arc::new(SetStatusAction::permanent(files.clone())))
            .await?;
        self.register(Arc::new(SetStatusAction::temporary(files.clone())))
            .await?;
        Ok(())
    }

    pub async fn register(&self, action: Arc<dyn FileAction>) -> Result<()> {
        let name = action.name().to_string();
        let mut actions = self.actions.write().await;
        if actions.contains_key(&name) {
            bail!("Action '{}' is already registered", name);
        }
        tracing::info!(action = %name, "Registering file action");
        actions.insert(name, action);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn FileAction>> {
        self.actions.read().await.get(name).cloned()
    }

    /// `(name, label)` pairs sorted by name
    pub async fn list(&self) -> Vec<(String, String)> {
        let actions = self.actions.read().await;
        let mut list: Vec<(String, String)> = actions
            .values()
            .map(|a| (a.name().to_string(), a.label().to_string()))
            .collect();
        list.sort();
        list
    }

    /// Run a command against every target. Fails only for an unknown action.
    #[tracing::instrument(skip(self, command), fields(action = %command.action, targets = command.targets.len()))]
    pub async fn dispatch(&self, command: &ActionCommand) -> Result<ActionReport> {
        let action = self
            .get(&command.action)
            .await
            .with_context(|| format!("Unknown action '{}'", command.action))?;

        let mut results = Vec::with_capacity(command.targets.len());
        for &file_id in &command.targets {
            match action.execute(file_id).await {
                Ok(()) => results.push(ActionTargetResult {
                    file_id,
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(file_id = %file_id, error = %e, "Action failed for target");
                    results.push(ActionTargetResult {
                        file_id,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let report = ActionReport {
            action: command.action.clone(),
            results,
        };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Action dispatched"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::UploadRequest;
    use crate::setup::Services;
    use fentity_core::Config;
    use fentity_storage::MemoryStorage;

    struct CountingAction {
        calls: std::sync::Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl FileAction for CountingAction {
        fn name(&self) -> &str {
            "count"
        }

        fn label(&self) -> &str {
            "Count"
        }

        async fn execute(&self, file_id: Uuid) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(file_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_fails() {
        let registry = ActionRegistry::new();
        let action = Arc::new(CountingAction {
            calls: Default::default(),
        });
        registry.register(action.clone()).await.unwrap();
        assert!(registry.register(action).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_action_is_an_error() {
        let registry = ActionRegistry::new();
        let command = ActionCommand::new("nope", vec![Uuid::new_v4()]);
        assert!(registry.dispatch(&command).await.is_err());
    }

    #[tokio::test]
    async fn test_builtin_actions_report_per_target() {
        let services = Services::in_memory(Config::default(), Arc::new(MemoryStorage::new()))
            .await
            .unwrap();
        let record = services
            .files
            .upload(UploadRequest::new("a.txt", "text/plain", b"a".to_vec()))
            .await
            .unwrap();
        let missing = Uuid::new_v4();

        let names: Vec<String> = services
            .actions
            .list()
            .await
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "file_delete_action",
                "file_permanent_action",
                "file_temporary_action"
            ]
        );

        let report = services
            .actions
            .dispatch(&ActionCommand::new(
                SetStatusAction::TEMPORARY,
                vec![record.id, missing],
            ))
            .await
            .unwrap();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.results[1].file_id, missing);
        assert!(!services.files.get(record.id).await.unwrap().is_permanent());
    }
}
