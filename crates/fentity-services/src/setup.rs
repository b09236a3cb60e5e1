//! Service initialization

use std::sync::Arc;

use anyhow::{Context, Result};
use fentity_core::hooks::{AuditSink, NoOpAuditSink};
use fentity_core::Config;
use fentity_db::{setup_in_memory, FileRepository, FileTypeRepository, KeyedLocks, SqlitePool};
use fentity_plugins::{
    AnonymousUploadRule, ClassifierRegistry, FileDetailsContributor, FormatterRegistry,
    GenericFileFormatter, ImageFormatter, IndexRegistry, MetadataIndexContributor, MimeTypeRule,
};
use fentity_storage::Storage;

use crate::actions::ActionRegistry;
use crate::file_types::FileTypeService;
use crate::files::FileService;
use crate::interchange::InterchangeService;
use crate::replacement::ReplacementWorkflow;
use crate::search::SearchIndexer;

/// Every service wired to one pool, one blob store and one set of locks
#[derive(Clone)]
pub struct Services {
    pub config: Config,
    pub files: FileService,
    pub file_types: FileTypeService,
    pub replacement: ReplacementWorkflow,
    pub interchange: InterchangeService,
    pub actions: ActionRegistry,
    pub search: SearchIndexer,
    pub classifier: ClassifierRegistry,
    pub index_registry: IndexRegistry,
    pub formatters: FormatterRegistry,
}

impl Services {
    /// Build the services and register the built-in rules, contributors and
    /// actions
    pub async fn build(
        config: Config,
        pool: SqlitePool,
        storage: Arc<dyn Storage>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        let file_repo = FileRepository::new(pool.clone());
        let type_repo = FileTypeRepository::new(pool);
        let record_locks = Arc::new(KeyedLocks::new());
        let locator_locks = Arc::new(KeyedLocks::new());

        let classifier = ClassifierRegistry::new();
        classifier
            .register_rule(Arc::new(MimeTypeRule::new()))
            .await
            .context("Failed to register MIME type rule")?;
        if let Some(ref anonymous_type) = config.anonymous_file_type {
            classifier
                .register_rule(Arc::new(AnonymousUploadRule::new(anonymous_type.clone())))
                .await
                .context("Failed to register anonymous upload rule")?;
        }

        let index_registry = IndexRegistry::new();
        index_registry
            .register(Arc::new(MetadataIndexContributor))
            .await?;
        index_registry
            .register(Arc::new(FileDetailsContributor))
            .await?;

        let formatters = FormatterRegistry::new();
        formatters
            .register(Arc::new(GenericFileFormatter))
            .await
            .context("Failed to register generic file formatter")?;
        formatters
            .register(Arc::new(ImageFormatter))
            .await
            .context("Failed to register image formatter")?;

        let file_types = FileTypeService::new(
            type_repo.clone(),
            file_repo.clone(),
            classifier.clone(),
            record_locks.clone(),
        );
        let files = FileService::new(
            file_repo.clone(),
            storage.clone(),
            file_types.clone(),
            record_locks.clone(),
            config.staging_prefix(),
            config.max_upload_size_bytes,
        );
        let replacement = ReplacementWorkflow::new(
            file_repo.clone(),
            storage.clone(),
            audit,
            record_locks,
            locator_locks.clone(),
            config.staging_prefix(),
            config.max_upload_size_bytes,
            config.swap_timeout(),
        );
        let interchange = InterchangeService::new(file_repo, type_repo, storage, locator_locks);

        let actions = ActionRegistry::new();
        actions
            .register_builtin(&files)
            .await
            .context("Failed to register built-in actions")?;

        tracing::info!(
            classifier_stages = classifier.list().await.len(),
            index_contributors = index_registry.names().await.len(),
            formatters = formatters.list().await.len(),
            "Services initialized"
        );

        Ok(Self {
            config,
            files,
            file_types,
            replacement,
            interchange,
            actions,
            search: SearchIndexer::new(index_registry.clone()),
            classifier,
            index_registry,
            formatters,
        })
    }

    /// Services over a fresh in-memory database, without auditing
    pub async fn in_memory(config: Config, storage: Arc<dyn Storage>) -> Result<Self> {
        Self::in_memory_with_audit(config, storage, Arc::new(NoOpAuditSink)).await
    }

    pub async fn in_memory_with_audit(
        config: Config,
        storage: Arc<dyn Storage>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        let pool = setup_in_memory().await?;
        Self::build(config, pool, storage, audit).await
    }
}
