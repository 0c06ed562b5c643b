//! Import command - load exported insight documents into the store

use anyhow::{Context, Result};
use std::path::PathBuf;
use subreddit_insights_adapters::import::JsonExportReader;
use subreddit_insights_domain::{Clock, InsightStore, SystemClock};

use super::open_store;
use crate::args::ImportArgs;
use crate::config::AppConfig;

pub async fn execute(args: ImportArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let documents = JsonExportReader::new(&args.file)
        .read(SystemClock.now())
        .await
        .with_context(|| format!("Failed to read export: {}", args.file.display()))?;

    let store = open_store(&config).await?;
    for document in &documents {
        store
            .upsert(document)
            .await
            .with_context(|| format!("Failed to store document {}", document.id))?;
        tracing::debug!(id = %document.id, subreddit = %document.subreddit, "Stored document");
    }

    println!(
        "Imported {} document(s) into {}",
        documents.len(),
        config.store.db_path.display()
    );

    Ok(())
}
