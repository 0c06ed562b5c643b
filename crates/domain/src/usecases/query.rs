//! Insight query use case - resolves which document to serve and maps it

use std::sync::Arc;
use thiserror::Error;

use crate::{
    model::{DocumentId, Fallback, FallbackReason, InsightDocument, InsightsResponse},
    ports::{InsightStore, StoreError, SubredditMatch},
    usecases::map::{InsightMapper, MapperConfig},
};

/// Subreddit served when a request names none
pub const DEFAULT_SUBREDDIT: &str = "uberdrivers";

/// Configuration for the query use case
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub default_subreddit: String,
    pub mapper: MapperConfig,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_subreddit: DEFAULT_SUBREDDIT.to_string(),
            mapper: MapperConfig::default(),
        }
    }
}

/// Error type for insight queries
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{}", not_found_message(.subreddit, .requested_id))]
    NotFound {
        subreddit: String,
        requested_id: Option<String>,
    },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

fn not_found_message(subreddit: &str, requested_id: &Option<String>) -> String {
    match requested_id {
        Some(id) => format!("No insight data found for id {id} ({subreddit})."),
        None => format!("No insight data found for subreddit {subreddit}."),
    }
}

/// Use case for serving insights for a subreddit
pub struct InsightQuery<S: InsightStore + ?Sized> {
    store: Arc<S>,
    config: QueryConfig,
    mapper: InsightMapper,
}

impl<S: InsightStore + ?Sized> InsightQuery<S> {
    pub fn new(store: Arc<S>, config: QueryConfig) -> Self {
        let mapper = InsightMapper::new(config.mapper);
        Self {
            store,
            config,
            mapper,
        }
    }

    /// Resolve the document for `(subreddit, requested_id)` and map it.
    ///
    /// A requested id is honored only when it belongs to the requested
    /// subreddit; otherwise the latest document for the subreddit is served
    /// with a `Fallback` explaining why.
    pub async fn resolve(
        &self,
        subreddit: Option<&str>,
        requested_id: Option<&str>,
    ) -> Result<InsightsResponse, QueryError> {
        let subreddit = subreddit
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.config.default_subreddit.as_str())
            .to_string();
        let requested_id = requested_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let (mut document, mut reason) = match requested_id.as_deref() {
            None => (None, Some(FallbackReason::MissingId)),
            Some(raw) => match DocumentId::parse(raw) {
                Err(_) => (None, Some(FallbackReason::InvalidId)),
                Ok(id) => self.lookup_direct(&id, &subreddit).await?,
            },
        };

        if document.is_none() {
            document = self.lookup_latest(&subreddit).await?;
            reason.get_or_insert(FallbackReason::NotFound);
        }

        let Some(document) = document else {
            tracing::warn!(
                subreddit = %subreddit,
                requested_id = ?requested_id,
                "No insight document found"
            );
            return Err(QueryError::NotFound {
                subreddit,
                requested_id,
            });
        };

        let fallback = reason.map(|reason| Fallback {
            reason,
            requested_id: requested_id.clone(),
            requested_subreddit: Some(subreddit.clone()),
        });

        tracing::info!(
            subreddit = %document.subreddit,
            resolved_id = %document.id,
            fallback = ?fallback.as_ref().map(|f| f.reason),
            raw_count = document.raw_insights.len(),
            filtered_count = document.filtered_insights.len(),
            "Resolved insight document"
        );

        Ok(self.to_response(document, fallback))
    }

    async fn lookup_direct(
        &self,
        id: &DocumentId,
        subreddit: &str,
    ) -> Result<(Option<InsightDocument>, Option<FallbackReason>), QueryError> {
        match self.store.find_by_id(id).await? {
            Some(document) if document.subreddit == subreddit => Ok((Some(document), None)),
            Some(document) => {
                tracing::debug!(
                    id = %id,
                    requested = %subreddit,
                    actual = %document.subreddit,
                    "Discarding document from another subreddit"
                );
                Ok((None, Some(FallbackReason::SubredditMismatch)))
            }
            None => Ok((None, None)),
        }
    }

    async fn lookup_latest(&self, subreddit: &str) -> Result<Option<InsightDocument>, QueryError> {
        if let Some(document) = self
            .store
            .find_latest(subreddit, SubredditMatch::Exact)
            .await?
        {
            return Ok(Some(document));
        }

        Ok(self
            .store
            .find_latest(subreddit, SubredditMatch::CaseInsensitive)
            .await?)
    }

    fn to_response(&self, document: InsightDocument, fallback: Option<Fallback>) -> InsightsResponse {
        InsightsResponse {
            raw_insights: document
                .raw_insights
                .iter()
                .map(|value| self.mapper.map_raw_value(value))
                .collect(),
            filtered_insights: document
                .filtered_insights
                .iter()
                .map(|value| self.mapper.map_filtered_value(value))
                .collect(),
            resolved_id: document.id.to_string(),
            subreddit: document.subreddit,
            fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use time::OffsetDateTime;

    // Fake store with the same ordering rules as the real ones
    #[derive(Default)]
    struct FakeStore {
        documents: Vec<InsightDocument>,
        fail: bool,
        lookups: Mutex<Vec<SubredditMatch>>,
    }

    #[async_trait]
    impl InsightStore for FakeStore {
        async fn find_by_id(&self, id: &DocumentId) -> Result<Option<InsightDocument>, StoreError> {
            if self.fail {
                return Err(StoreError::Database("connection refused".to_string()));
            }
            Ok(self.documents.iter().find(|d| &d.id == id).cloned())
        }

        async fn find_latest(
            &self,
            subreddit: &str,
            matching: SubredditMatch,
        ) -> Result<Option<InsightDocument>, StoreError> {
            if self.fail {
                return Err(StoreError::Database("connection refused".to_string()));
            }
            self.lookups.lock().unwrap().push(matching);
            let mut candidates: Vec<_> = self
                .documents
                .iter()
                .filter(|d| matching.matches(&d.subreddit, subreddit))
                .cloned()
                .collect();
            candidates.sort_by(InsightDocument::latest_first);
            Ok(candidates.into_iter().next())
        }

        async fn upsert(&self, _document: &InsightDocument) -> Result<(), StoreError> {
            Ok(())
        }
    }

    const ID_A: &str = "68fdd0416736f9ac1aad9513";
    const ID_B: &str = "68fdd0416736f9ac1aad9514";
    const ID_C: &str = "68fdd0416736f9ac1aad9515";

    fn document(id: &str, subreddit: &str, created: Option<i64>, raw: Value) -> InsightDocument {
        InsightDocument {
            id: DocumentId::parse(id).unwrap(),
            subreddit: subreddit.to_string(),
            raw_insights: raw.as_array().cloned().unwrap_or_default(),
            filtered_insights: vec![],
            created_at: created.map(|s| OffsetDateTime::from_unix_timestamp(s).unwrap()),
            updated_at: None,
        }
    }

    fn query(documents: Vec<InsightDocument>) -> InsightQuery<FakeStore> {
        InsightQuery::new(
            Arc::new(FakeStore {
                documents,
                ..FakeStore::default()
            }),
            QueryConfig::default(),
        )
    }

    fn fixture() -> Vec<InsightDocument> {
        vec![
            document(
                ID_A,
                "uberdrivers",
                Some(1_000),
                json!([{"topic": "Surge pricing", "num_mentions": 5, "mentions": []}]),
            ),
            document(ID_B, "uberdrivers", Some(2_000), json!([{"topic": "Tips"}])),
            document(ID_C, "lyftdrivers", Some(3_000), json!([{"topic": "Bonuses"}])),
        ]
    }

    #[tokio::test]
    async fn test_exact_id_match() {
        let response = query(fixture())
            .resolve(Some("uberdrivers"), Some(ID_A))
            .await
            .unwrap();

        assert_eq!(response.resolved_id, ID_A);
        assert!(response.fallback.is_none());
        assert_eq!(
            serde_json::to_value(&response.raw_insights[0]).unwrap(),
            json!({
                "Topic": "Surge pricing",
                "Timeline": "Unknown date",
                "Mentions": 5,
                "HourlyMentions": []
            })
        );
    }

    #[tokio::test]
    async fn test_uppercase_id_is_accepted() {
        let response = query(fixture())
            .resolve(Some("uberdrivers"), Some(&ID_A.to_uppercase()))
            .await
            .unwrap();
        assert_eq!(response.resolved_id, ID_A);
        assert!(response.fallback.is_none());
    }

    #[tokio::test]
    async fn test_subreddit_mismatch_never_serves_foreign_document() {
        let response = query(fixture())
            .resolve(Some("uberdrivers"), Some(ID_C))
            .await
            .unwrap();

        assert_ne!(response.resolved_id, ID_C);
        assert_eq!(response.resolved_id, ID_B);
        let fallback = response.fallback.unwrap();
        assert_eq!(fallback.reason, FallbackReason::SubredditMismatch);
        assert_eq!(fallback.requested_id.as_deref(), Some(ID_C));
        assert_eq!(fallback.requested_subreddit.as_deref(), Some("uberdrivers"));
    }

    #[tokio::test]
    async fn test_missing_invalid_and_unknown_ids() {
        let service = query(fixture());

        let missing = service.resolve(Some("uberdrivers"), None).await.unwrap();
        assert_eq!(missing.resolved_id, ID_B);
        assert_eq!(missing.fallback.unwrap().reason, FallbackReason::MissingId);

        let invalid = service.resolve(Some("uberdrivers"), Some("xyz")).await.unwrap();
        assert_eq!(invalid.fallback.unwrap().reason, FallbackReason::InvalidId);

        let unknown = service
            .resolve(Some("uberdrivers"), Some("000000000000000000000000"))
            .await
            .unwrap();
        assert_eq!(unknown.resolved_id, ID_B);
        assert_eq!(unknown.fallback.unwrap().reason, FallbackReason::NotFound);
    }

    #[tokio::test]
    async fn test_blank_subreddit_uses_default() {
        let response = query(fixture()).resolve(Some("  "), None).await.unwrap();
        assert_eq!(response.subreddit, "uberdrivers");
        assert_eq!(response.resolved_id, ID_B);
    }

    #[tokio::test]
    async fn test_case_insensitive_fallback_after_exact() {
        let service = query(fixture());
        let response = service.resolve(Some("UberDrivers"), None).await.unwrap();

        assert_eq!(response.subreddit, "uberdrivers");
        assert_eq!(response.resolved_id, ID_B);
        assert_eq!(
            *service.store.lookups.lock().unwrap(),
            vec![SubredditMatch::Exact, SubredditMatch::CaseInsensitive]
        );
    }

    #[tokio::test]
    async fn test_latest_tie_breaks_on_id() {
        let documents = vec![
            document(ID_A, "uberdrivers", Some(5_000), json!([])),
            document(ID_B, "uberdrivers", Some(5_000), json!([])),
            document(ID_C, "uberdrivers", None, json!([])),
        ];
        let response = query(documents).resolve(None, None).await.unwrap();
        assert_eq!(response.resolved_id, ID_B);
    }

    #[tokio::test]
    async fn test_not_found_messages() {
        let service = query(vec![]);

        let err = service.resolve(Some("taxi"), None).await.unwrap_err();
        assert_eq!(err.to_string(), "No insight data found for subreddit taxi.");

        let err = service.resolve(Some("taxi"), Some(ID_A)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("No insight data found for id {ID_A} (taxi).")
        );
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let service = InsightQuery::new(
            Arc::new(FakeStore {
                fail: true,
                ..FakeStore::default()
            }),
            QueryConfig::default(),
        );
        let err = service.resolve(None, Some(ID_A)).await.unwrap_err();
        assert!(matches!(err, QueryError::Store(_)));
    }
}
