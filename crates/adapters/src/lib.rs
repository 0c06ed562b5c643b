//! subreddit-insights adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `store`: SQLite and in-memory insight/user stores
//! - `import`: Reader for exported insight documents
//! - `llm`: Chat completion adapters (OpenAI, Azure OpenAI, stub)

mod import_fs;
mod store_memory;
mod store_sqlite;

pub mod llm;

/// Re-exports for store adapters
pub mod store {
    pub use crate::store_memory::{InMemoryInsightStore, InMemoryUserStore};
    pub use crate::store_sqlite::SqliteInsightStore;
}

/// Re-exports for import adapters
pub mod import {
    pub use crate::import_fs::{ImportError, JsonExportReader, parse_export};
}
