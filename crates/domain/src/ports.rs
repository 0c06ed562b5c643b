//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{ChatMessage, DocumentId, InsightDocument, User};

/// Error type for insight store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid stored document {id}: {message}")]
    InvalidDocument { id: String, message: String },
}

/// How a subreddit name is compared against stored documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubredditMatch {
    Exact,
    CaseInsensitive,
}

impl SubredditMatch {
    pub fn matches(self, stored: &str, requested: &str) -> bool {
        match self {
            Self::Exact => stored == requested,
            Self::CaseInsensitive => stored.to_lowercase() == requested.to_lowercase(),
        }
    }
}

/// Port for reading and writing insight documents
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Direct lookup by identifier
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<InsightDocument>, StoreError>;

    /// Newest document for a subreddit: `created_at` descending, then id
    /// descending. Documents without `created_at` sort last.
    async fn find_latest(
        &self,
        subreddit: &str,
        matching: SubredditMatch,
    ) -> Result<Option<InsightDocument>, StoreError>;

    /// Insert or replace a document by id
    async fn upsert(&self, document: &InsightDocument) -> Result<(), StoreError>;
}

/// Error type for chat completion
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("No response content returned from the model.")]
    EmptyReply,
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for a hosted chat model
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Send the full conversation and return the assistant's reply text
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;

    /// Model or deployment name, for logs
    fn model_name(&self) -> &str;
}

/// Error type for user registration
#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),
    #[error("A user with email {0} already exists")]
    Duplicate(String),
    #[error("Database error: {0}")]
    Store(String),
}

/// Port for persisting registered users
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users in creation order
    async fn list_users(&self) -> Result<Vec<User>, UserError>;

    /// Insert a new user; fails with `Duplicate` when the email is taken
    async fn insert_user(&self, user: &User) -> Result<(), UserError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
