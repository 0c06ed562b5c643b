//! SQLite insight and user store implementation

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use subreddit_insights_domain::{
    DocumentId, InsightDocument, InsightStore, StoreError, SubredditMatch, User, UserError,
    UserStore,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

type DocumentRow = (String, String, Option<i64>, Option<i64>, String, String);

const SELECT_DOCUMENT: &str = r#"
    SELECT id, subreddit, created_at_ms, updated_at_ms, raw_insights, filtered_insights
    FROM insights
"#;

/// SQLite-backed store for insight documents and users
pub struct SqliteInsightStore {
    pool: SqlitePool,
}

impl SqliteInsightStore {
    /// Open (or create) the database file and run migrations
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS insights (
                id TEXT PRIMARY KEY,
                subreddit TEXT NOT NULL,
                created_at_ms INTEGER,
                updated_at_ms INTEGER,
                raw_insights TEXT NOT NULL,
                filtered_insights TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_insights_latest
            ON insights(subreddit, created_at_ms DESC, id DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

fn to_millis(instant: Option<OffsetDateTime>) -> Option<i64> {
    instant.and_then(|t| i64::try_from(t.unix_timestamp_nanos() / 1_000_000).ok())
}

fn from_millis(id: &str, millis: Option<i64>) -> Result<Option<OffsetDateTime>, StoreError> {
    millis
        .map(|ms| {
            OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).map_err(|e| {
                StoreError::InvalidDocument {
                    id: id.to_string(),
                    message: e.to_string(),
                }
            })
        })
        .transpose()
}

fn parse_insights(id: &str, column: &str) -> Result<Vec<Value>, StoreError> {
    serde_json::from_str(column).map_err(|e| StoreError::InvalidDocument {
        id: id.to_string(),
        message: e.to_string(),
    })
}

fn row_to_document(row: DocumentRow) -> Result<InsightDocument, StoreError> {
    let (id, subreddit, created_at_ms, updated_at_ms, raw, filtered) = row;

    let document_id = DocumentId::parse(&id).map_err(|e| StoreError::InvalidDocument {
        id: id.clone(),
        message: e.to_string(),
    })?;

    Ok(InsightDocument {
        subreddit,
        raw_insights: parse_insights(&id, &raw)?,
        filtered_insights: parse_insights(&id, &filtered)?,
        created_at: from_millis(&id, created_at_ms)?,
        updated_at: from_millis(&id, updated_at_ms)?,
        id: document_id,
    })
}

#[async_trait]
impl InsightStore for SqliteInsightStore {
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<InsightDocument>, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as(&format!("{SELECT_DOCUMENT} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(row_to_document).transpose()
    }

    async fn find_latest(
        &self,
        subreddit: &str,
        matching: SubredditMatch,
    ) -> Result<Option<InsightDocument>, StoreError> {
        let filter = match matching {
            SubredditMatch::Exact => "subreddit = ?",
            SubredditMatch::CaseInsensitive => "subreddit = ? COLLATE NOCASE",
        };
        let sql = format!(
            "{SELECT_DOCUMENT} WHERE {filter} \
             ORDER BY created_at_ms IS NULL, created_at_ms DESC, id DESC LIMIT 1"
        );

        let row: Option<DocumentRow> = sqlx::query_as(&sql)
            .bind(subreddit)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(row_to_document).transpose()
    }

    async fn upsert(&self, document: &InsightDocument) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&document.raw_insights)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let filtered = serde_json::to_string(&document.filtered_insights)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO insights
            (id, subreddit, created_at_ms, updated_at_ms, raw_insights, filtered_insights)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                subreddit = excluded.subreddit,
                created_at_ms = excluded.created_at_ms,
                updated_at_ms = excluded.updated_at_ms,
                raw_insights = excluded.raw_insights,
                filtered_insights = excluded.filtered_insights
            "#,
        )
        .bind(document.id.as_str())
        .bind(&document.subreddit)
        .bind(to_millis(document.created_at))
        .bind(to_millis(document.updated_at))
        .bind(&raw)
        .bind(&filtered)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteInsightStore {
    async fn list_users(&self) -> Result<Vec<User>, UserError> {
        let rows: Vec<(String, String, String, String)> =
            sqlx::query_as("SELECT id, name, email, created_at FROM users ORDER BY rowid")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| UserError::Store(e.to_string()))?;

        rows.into_iter()
            .map(|(id, name, email, created_at)| {
                Ok(User {
                    id: Uuid::parse_str(&id).map_err(|e| UserError::Store(e.to_string()))?,
                    name,
                    email,
                    created_at: OffsetDateTime::parse(&created_at, &Rfc3339)
                        .map_err(|e| UserError::Store(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn insert_user(&self, user: &User) -> Result<(), UserError> {
        let created_at = user
            .created_at
            .format(&Rfc3339)
            .map_err(|e| UserError::Store(e.to_string()))?;

        sqlx::query("INSERT INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)")
            .bind(user.id.to_string())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => UserError::Duplicate(user.email.clone()),
                _ => UserError::Store(e.to_string()),
            })?;

        Ok(())
    }
}
