//! In-memory stores for testing and offline mode

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use subreddit_insights_domain::{
    DocumentId, InsightDocument, InsightStore, StoreError, SubredditMatch, User, UserError,
    UserStore,
};

/// In-memory insight store implementation
pub struct InMemoryInsightStore {
    documents: RwLock<HashMap<DocumentId, InsightDocument>>,
}

impl InMemoryInsightStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Store pre-seeded with documents
    pub fn with_documents(documents: impl IntoIterator<Item = InsightDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|document| (document.id.clone(), document))
            .collect();
        Self {
            documents: RwLock::new(documents),
        }
    }
}

impl Default for InMemoryInsightStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InsightStore for InMemoryInsightStore {
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<InsightDocument>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(documents.get(id).cloned())
    }

    async fn find_latest(
        &self,
        subreddit: &str,
        matching: SubredditMatch,
    ) -> Result<Option<InsightDocument>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(documents
            .values()
            .filter(|document| matching.matches(&document.subreddit, subreddit))
            .min_by(|a, b| InsightDocument::latest_first(a, b))
            .cloned())
    }

    async fn upsert(&self, document: &InsightDocument) -> Result<(), StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))?;
        documents.insert(document.id.clone(), document.clone());
        Ok(())
    }
}

/// In-memory user store implementation
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list_users(&self) -> Result<Vec<User>, UserError> {
        let users = self
            .users
            .read()
            .map_err(|e| UserError::Store(e.to_string()))?;
        Ok(users.clone())
    }

    async fn insert_user(&self, user: &User) -> Result<(), UserError> {
        let mut users = self
            .users
            .write()
            .map_err(|e| UserError::Store(e.to_string()))?;
        if users.iter().any(|existing| existing.email == user.email) {
            return Err(UserError::Duplicate(user.email.clone()));
        }
        users.push(user.clone());
        Ok(())
    }
}
