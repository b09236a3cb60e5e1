//! fentity CLI: manage file records against the configured database and storage.
//!
//! Configuration comes from the environment (or `.env`): DATABASE_URL,
//! STORAGE_BACKEND, LOCAL_STORAGE_PATH and friends.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use fentity_cli::{format_record_row, init_tracing};
use fentity_core::hooks::TracingAuditSink;
use fentity_core::models::{FileStatus, ListFilesQuery, NewFileType};
use fentity_core::{AppError, Config, ErrorMetadata};
use fentity_db::setup_database;
use fentity_services::{ActionCommand, InterchangeService, ReplacementUpload, Services, UploadRequest};
use fentity_storage::create_storage;
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "fentity", about = "File record management CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and classify it
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// MIME type of the content
        #[arg(long, default_value = "application/octet-stream")]
        mime: String,
        /// Owner UUID; omit for an anonymous upload
        #[arg(long)]
        owner: Option<Uuid>,
        /// Store as temporary instead of permanent
        #[arg(long)]
        temporary: bool,
        #[arg(long)]
        description: Option<String>,
    },
    /// Get a single file record by ID
    Get { id: Uuid },
    /// List file records
    List {
        /// Filter by file type
        #[arg(long)]
        r#type: Option<String>,
        /// Filter by status: permanent or temporary
        #[arg(long)]
        status: Option<FileStatus>,
        #[arg(long, default_value = "50")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Re-run classification for a file and store the result
    Classify { id: Uuid },
    /// Replace a file's content, keeping its record and locator
    Replace {
        id: Uuid,
        /// Path to the replacement content
        file: PathBuf,
        #[arg(long)]
        mime: Option<String>,
        /// Swap deadline in seconds (defaults to SWAP_TIMEOUT_SECS)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Delete a file record and its content
    Delete { id: Uuid },
    /// Export a file record with its content as JSON
    Export {
        id: Uuid,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import a file record from an exported JSON document
    Import { input: PathBuf },
    /// Show the search index entry for a file
    Index { id: Uuid },
    /// File type operations
    Types {
        #[command(subcommand)]
        sub: TypeCommands,
    },
    /// Run a bulk action, or list the actions when no name is given
    Action {
        name: Option<String>,
        targets: Vec<Uuid>,
    },
    /// Count live files per type
    Stats,
    /// List display formatters, or those that fit one file
    Formatters {
        #[arg(long)]
        file: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum TypeCommands {
    /// Create a file type
    Create {
        /// Machine name
        id: String,
        label: String,
        /// MIME pattern, e.g. image/* (repeatable)
        #[arg(long = "mime")]
        mimetypes: Vec<String>,
        #[arg(long, default_value = "0")]
        weight: i32,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List file types in classification order
    List,
    /// Delete a file type; its files fall back to undefined
    Delete { id: String },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn file_name(path: &std::path::Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    let pool = setup_database(&config).await?;
    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    let services = Services::build(config, pool, storage, Arc::new(TracingAuditSink)).await?;

    if let Err(e) = run(cli.command, &services).await {
        if let Some(app_error) = e.downcast_ref::<AppError>() {
            tracing::error!(
                error_code = app_error.error_code(),
                recoverable = app_error.is_recoverable(),
                suggested_action = app_error.suggested_action().unwrap_or(""),
                "{}",
                app_error.client_message()
            );
        }
        return Err(e);
    }
    Ok(())
}

async fn run(command: Commands, services: &Services) -> anyhow::Result<()> {
    match command {
        Commands::Upload {
            file,
            mime,
            owner,
            temporary,
            description,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut request = UploadRequest::new(file_name(&file)?, mime, data);
            if let Some(owner) = owner {
                request = request.with_owner(owner);
            }
            if temporary {
                request = request.with_status(FileStatus::Temporary);
            }
            if let Some(description) = description {
                request = request.with_description(description);
            }
            let record = services.files.upload(request).await?;
            print_json(&record)?;
        }
        Commands::Get { id } => {
            print_json(&services.files.get(id).await?)?;
        }
        Commands::List {
            r#type,
            status,
            limit,
            offset,
            format,
        } => {
            let query = ListFilesQuery {
                file_type: r#type,
                status,
                limit,
                offset,
            };
            let records = services.files.list(&query).await?;
            match format {
                OutputFormat::Json => print_json(&records)?,
                OutputFormat::Table => {
                    for record in &records {
                        println!("{}", format_record_row(record));
                    }
                }
            }
        }
        Commands::Classify { id } => {
            print_json(&services.files.classify_and_assign(id).await?)?;
        }
        Commands::Replace {
            id,
            file,
            mime,
            timeout,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut upload = ReplacementUpload::new(file_name(&file)?, data);
            if let Some(mime) = mime {
                upload = upload.with_mime(mime);
            }
            let mut staged = services.replacement.stage(id, upload).await?;
            let record = services
                .replacement
                .commit(&mut staged, timeout.map(Duration::from_secs))
                .await?;
            print_json(&record)?;
        }
        Commands::Delete { id } => {
            services.files.delete(id).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("File {} deleted", id) }),
            )?;
        }
        Commands::Export { id, output } => {
            let doc = services.interchange.export_record(id).await?;
            let json = InterchangeService::to_json(&doc)?;
            match output {
                Some(path) => tokio::fs::write(&path, json)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
        }
        Commands::Import { input } => {
            let json = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let doc = InterchangeService::from_json(&json)?;
            print_json(&services.interchange.import_record(doc).await?)?;
        }
        Commands::Index { id } => {
            let record = services.files.get(id).await?;
            print_json(&serde_json::json!({
                "id": record.id,
                "text": services.search.index_text(&record).await,
                "extras": services.search.result_extras(&record).await,
            }))?;
        }
        Commands::Types { sub } => match sub {
            TypeCommands::Create {
                id,
                label,
                mimetypes,
                weight,
                description,
            } => {
                let new = NewFileType::new(id, label)
                    .with_mimetypes(mimetypes)
                    .with_weight(weight)
                    .with_description(description);
                print_json(&services.file_types.create(new).await?)?;
            }
            TypeCommands::List => {
                print_json(&services.file_types.list().await?)?;
            }
            TypeCommands::Delete { id } => {
                let reassigned = services.file_types.delete(&id).await?;
                print_json(&serde_json::json!({ "deleted": id, "reassigned_files": reassigned }))?;
            }
        },
        Commands::Action { name, targets } => match name {
            Some(name) => {
                let report = services
                    .actions
                    .dispatch(&ActionCommand::new(name, targets))
                    .await?;
                print_json(&report)?;
            }
            None => {
                let actions: Vec<_> = services
                    .actions
                    .list()
                    .await
                    .into_iter()
                    .map(|(name, label)| serde_json::json!({ "name": name, "label": label }))
                    .collect();
                print_json(&actions)?;
            }
        },
        Commands::Stats => {
            let counts: serde_json::Map<String, serde_json::Value> = services
                .files
                .count_by_type()
                .await?
                .into_iter()
                .map(|(file_type, count)| (file_type, count.into()))
                .collect();
            print_json(&counts)?;
        }
        Commands::Formatters { file } => {
            let formatters = match file {
                Some(id) => {
                    let record = services.files.get(id).await?;
                    services.formatters.formatters_for(&record).await
                }
                None => services.formatters.list().await,
            };
            print_json(&formatters)?;
        }
    }

    Ok(())
}
