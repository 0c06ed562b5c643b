//! Subcommand implementations

pub mod chat;
pub mod config;
pub mod import;
pub mod query;
pub mod serve;

use anyhow::{Context, Result};
use std::sync::Arc;
use subreddit_insights_adapters::store::SqliteInsightStore;

use crate::config::AppConfig;

/// Open (and migrate) the configured SQLite store
pub(crate) async fn open_store(config: &AppConfig) -> Result<Arc<SqliteInsightStore>> {
    let path = &config.store.db_path;
    let store = SqliteInsightStore::new(path)
        .await
        .with_context(|| format!("Failed to open insight store: {}", path.display()))?;
    Ok(Arc::new(store))
}
