//! Serve command - run the HTTP API

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use subreddit_insights_domain::SystemClock;

use super::chat::build_chat_completer;
use super::open_store;
use crate::args::ServeArgs;
use crate::config::AppConfig;
use crate::server::{AppState, run_server};

pub async fn execute(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let store = open_store(&config).await?;
    let chat = build_chat_completer(&config)?;

    tracing::info!(
        db_path = %config.store.db_path.display(),
        provider = %config.chat.provider,
        model = %chat.model_name(),
        default_subreddit = %config.general.default_subreddit,
        "Starting subreddit-insights server"
    );

    let state = AppState::new(
        store.clone(),
        store,
        chat,
        Arc::new(SystemClock),
        config.query_config(),
    );

    run_server(&bind, state).await
}
