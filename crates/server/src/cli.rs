//! CLI argument parsing and subcommand dispatch.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use docvault_core::{Config, DocumentId, DocumentRecord, ListOrder};
use docvault_registry::{UploadOutcome, UploadRequest};

use crate::startup;

#[derive(Parser)]
#[command(name = "docvault", version, about = "License document registry")]
pub struct Cli {
    /// Config profile; keys are read as `{PROFILE}_{KEY}` before `{KEY}`.
    #[arg(long, env = "DOCVAULT_PROFILE", global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn load_config(&self) -> Config {
        Config::for_profile(self.profile.as_deref().unwrap_or(""))
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API.
    Serve,
    /// Store a PDF, replacing the current file for its type.
    Upload {
        /// Document type label, e.g. "Radio Permit".
        #[arg(long = "type")]
        document_type: String,
        file: PathBuf,
    },
    /// Print stored documents.
    List {
        /// Newest first instead of grouped by type.
        #[arg(long)]
        history: bool,
    },
    /// Remove a document and its file.
    Delete { id: DocumentId },
    /// Remove uploaded files that no document references.
    Sweep {
        /// Skip files modified within this many minutes.
        #[arg(long, default_value_t = 10)]
        grace_minutes: i64,
    },
}

pub async fn dispatch(config: &Config, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve => startup::serve(config).await,
        Command::Upload { document_type, file } => upload(config, &document_type, file).await,
        Command::List { history } => {
            let order = if history { ListOrder::History } else { ListOrder::Catalog };
            list(config, order).await
        }
        Command::Delete { id } => delete(config, id).await,
        Command::Sweep { grace_minutes } => sweep(config, grace_minutes).await,
    }
}

async fn upload(config: &Config, document_type: &str, file: PathBuf) -> anyhow::Result<()> {
    let content = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let registry = startup::open_registry(config).await?;
    let outcome = registry
        .upload(UploadRequest::new(document_type, filename, content))
        .await;
    registry.close().await;

    match outcome? {
        UploadOutcome::Created { record } => {
            println!("Created {}", describe(&record));
        }
        UploadOutcome::Replaced { record, previous_file_path } => {
            println!("Replaced {} (was {})", describe(&record), previous_file_path);
        }
    }
    Ok(())
}

async fn list(config: &Config, order: ListOrder) -> anyhow::Result<()> {
    let registry = startup::open_registry(config).await?;
    let records = registry.list(order).await;
    registry.close().await;

    let records = records?;
    if records.is_empty() {
        println!("No documents stored");
        return Ok(());
    }
    println!("{:>5}  {:<28}  {:<19}  {}", "ID", "TYPE", "UPLOADED", "FILE");
    for r in &records {
        println!(
            "{:>5}  {:<28}  {:<19}  {}",
            r.id,
            r.display_label(),
            r.upload_date(),
            r.original_filename
        );
    }
    Ok(())
}

async fn delete(config: &Config, id: DocumentId) -> anyhow::Result<()> {
    let registry = startup::open_registry(config).await?;
    let deleted = registry.delete(id).await;
    registry.close().await;

    println!("Deleted {}", describe(&deleted?));
    Ok(())
}

async fn sweep(config: &Config, grace_minutes: i64) -> anyhow::Result<()> {
    let registry = startup::open_registry(config).await?;
    let removed = registry
        .sweep_orphans(chrono::Duration::minutes(grace_minutes.max(0)))
        .await;
    registry.close().await;

    let removed = removed?;
    for name in &removed {
        println!("removed {name}");
    }
    info!("Sweep complete: {} orphaned files removed", removed.len());
    Ok(())
}

fn describe(record: &DocumentRecord) -> String {
    format!(
        "{} (id {}) -> {}",
        record.display_label(),
        record.id,
        record.file_path
    )
}
