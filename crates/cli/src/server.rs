//! HTTP API for the insights dashboard.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/insights` | Mapped insights for `subreddit` / `id` |
//! | `GET`  | `/api/insights/summary` | Topic totals over a date window |
//! | `POST` | `/api/chat` | Forward a conversation to the chat model |
//! | `GET`  | `/api/users` | List registered users |
//! | `POST` | `/api/users` | Register a user |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Insight and chat errors are `{ "error": "..." }`. User endpoints wrap
//! every response in `{ "success": bool, ... }`.
//!
//! All origins, methods, and headers are permitted so the browser dashboard
//! can be served from anywhere.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use subreddit_insights_domain::usecases::{
    ChatUseCase, CloudOptions, DateWindow, InsightQuery, QueryConfig, QueryError, TopicTotal,
    UserService, cloud_terms, filter_by_window,
};
use subreddit_insights_domain::{
    ChatCompleter, ChatError, ChatMessage, Clock, InsightStore, InsightsResponse, NewUser, User,
    UserError, UserStore,
};
use tower_http::cors::{Any, CorsLayer};

const INSIGHTS_UNAVAILABLE: &str = "Failed to load insight data. Please try again later.";
const CHAT_UNAVAILABLE: &str = "Failed to reach the language model. Please try again later.";
const USERS_UNAVAILABLE: &str = "Failed to access users. Please try again later.";
const INVALID_JSON: &str = "Invalid JSON payload.";
const INVALID_MESSAGES: &str = "messages must be a non-empty array.";

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    insights: Arc<InsightQuery<dyn InsightStore>>,
    chat: Arc<ChatUseCase<dyn ChatCompleter>>,
    users: Arc<UserService<dyn UserStore, dyn Clock>>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn InsightStore>,
        users: Arc<dyn UserStore>,
        chat: Arc<dyn ChatCompleter>,
        clock: Arc<dyn Clock>,
        query: QueryConfig,
    ) -> Self {
        Self {
            insights: Arc::new(InsightQuery::new(store, query)),
            chat: Arc::new(ChatUseCase::new(chat)),
            users: Arc::new(UserService::new(users, clock.clone())),
            clock,
        }
    }
}

/// Build the router with CORS and state attached
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/insights", get(handle_insights))
        .route("/api/insights/summary", get(handle_summary))
        .route("/api/chat", post(handle_chat))
        .route("/api/users", get(handle_list_users).post(handle_create_user))
        .layer(cors)
        .with_state(state)
}

/// Bind `bind` and serve until the process is terminated
pub async fn run_server(bind: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, router(state))
        .await
        .context("HTTP server failed")?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    error: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
    /// Emit `success: false` alongside the message
    enveloped: bool,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            enveloped: false,
        }
    }

    fn enveloped(mut self) -> Self {
        self.enveloped = true;
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: self.enveloped.then_some(false),
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, message)
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match &err {
            QueryError::NotFound { .. } => AppError::new(StatusCode::NOT_FOUND, err.to_string()),
            QueryError::Store(source) => {
                tracing::error!(error = %source, "Insight query failed");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, INSIGHTS_UNAVAILABLE)
            }
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidRequest(message) => bad_request(message),
            empty @ ChatError::EmptyReply => {
                AppError::new(StatusCode::BAD_GATEWAY, empty.to_string())
            }
            other => {
                tracing::error!(error = %other, "Chat completion failed");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, CHAT_UNAVAILABLE)
            }
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(message) => bad_request(message).enveloped(),
            duplicate @ UserError::Duplicate(_) => bad_request(duplicate.to_string()).enveloped(),
            UserError::Store(message) => {
                tracing::error!(error = %message, "User store failed");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, USERS_UNAVAILABLE).enveloped()
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ GET /api/insights ============

/// `ts` is sent by the dashboard to defeat caches and is ignored here
#[derive(Debug, Deserialize)]
struct InsightsParams {
    subreddit: Option<String>,
    id: Option<String>,
}

async fn handle_insights(
    State(state): State<AppState>,
    Query(params): Query<InsightsParams>,
) -> Result<Json<InsightsResponse>, AppError> {
    let response = state
        .insights
        .resolve(params.subreddit.as_deref(), params.id.as_deref())
        .await?;
    Ok(Json(response))
}

// ============ GET /api/insights/summary ============

#[derive(Debug, Deserialize)]
struct SummaryParams {
    subreddit: Option<String>,
    id: Option<String>,
    view: Option<String>,
    range: Option<String>,
    start: Option<String>,
    end: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    #[serde(rename = "Subreddit")]
    subreddit: String,
    #[serde(rename = "Resolved_Id")]
    resolved_id: String,
    #[serde(rename = "View")]
    view: &'static str,
    #[serde(rename = "Range")]
    range: String,
    #[serde(rename = "Topics")]
    topics: Vec<TopicTotal>,
}

async fn handle_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, AppError> {
    let filtered_view = match params.view.as_deref().map(str::trim) {
        None | Some("") => false,
        Some(v) if v.eq_ignore_ascii_case("raw") => false,
        Some(v) if v.eq_ignore_ascii_case("filtered") => true,
        Some(other) => {
            return Err(bad_request(format!(
                "Unknown view '{other}'. Expected raw or filtered."
            )));
        }
    };
    let window = DateWindow::parse(
        params.range.as_deref(),
        params.start.as_deref(),
        params.end.as_deref(),
    )
    .map_err(|e| bad_request(e.to_string()))?;

    let response = state
        .insights
        .resolve(params.subreddit.as_deref(), params.id.as_deref())
        .await?;

    let insights = if filtered_view {
        &response.filtered_insights
    } else {
        &response.raw_insights
    };
    let in_window = filter_by_window(insights, &window, state.clock.now());

    let mut options = CloudOptions::default();
    if let Some(limit) = params.limit {
        options.limit = limit;
    }
    let topics = cloud_terms(in_window, options);

    Ok(Json(SummaryResponse {
        subreddit: response.subreddit.clone(),
        resolved_id: response.resolved_id.clone(),
        view: if filtered_view { "filtered" } else { "raw" },
        range: window.label(),
        topics,
    }))
}

// ============ POST /api/chat ============

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Value,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = body.map_err(|_| bad_request(INVALID_JSON))?;
    let messages: Vec<ChatMessage> =
        serde_json::from_value(request.messages).map_err(|_| bad_request(INVALID_MESSAGES))?;

    let reply = state.chat.reply(&messages).await?;
    Ok(Json(ChatResponse { reply }))
}

// ============ /api/users ============

#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

async fn handle_list_users(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<User>>>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(Envelope {
        success: true,
        data: users,
    }))
}

async fn handle_create_user(
    State(state): State<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<User>>), AppError> {
    let Json(input) = body.map_err(|_| bad_request(INVALID_JSON).enveloped())?;
    let user = state.users.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            data: user,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use subreddit_insights_adapters::llm::StubChat;
    use subreddit_insights_adapters::store::{InMemoryInsightStore, InMemoryUserStore};
    use subreddit_insights_domain::{FixedClock, InsightDocument};
    use time::macros::datetime;

    const DOC_ID: &str = "68fdd0416736f9ac1aad9513";

    fn seeded_store() -> InMemoryInsightStore {
        let now = datetime!(2025-10-26 07:00 UTC);
        let doc = InsightDocument::from_export(
            &json!({
                "_id": {"$oid": DOC_ID},
                "subreddit": "uberdrivers",
                "created_at": "2025-10-26T07:00:00Z",
                "raw_insights": [
                    {
                        "topic": "Surge pricing",
                        "num_mentions": 7,
                        "mentions": [{"date_posted": "2025-10-25T10:15:00Z"}]
                    },
                    {
                        "topic": "Tips",
                        "num_mentions": 6,
                        "mentions": [{"date_posted": "2024-01-01T10:00:00Z"}]
                    }
                ],
                "filtered_insights": []
            }),
            now,
        )
        .unwrap();
        InMemoryInsightStore::with_documents([doc])
    }

    fn state_with_chat(chat: StubChat) -> AppState {
        AppState::new(
            Arc::new(seeded_store()),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(chat),
            Arc::new(FixedClock(datetime!(2025-10-27 00:00 UTC))),
            QueryConfig::default(),
        )
    }

    async fn spawn(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_insights_exact_and_fallback() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let client = reqwest::Client::new();

        let exact: Value = client
            .get(format!("{base}/api/insights"))
            .query(&[("subreddit", "uberdrivers"), ("id", DOC_ID), ("ts", "123")])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(exact["Resolved_Id"], DOC_ID);
        assert!(exact.get("Fallback").is_none());
        assert_eq!(exact["Raw_insights"][0]["Topic"], "Surge pricing");
        assert_eq!(exact["Raw_insights"][0]["Mentions"], 7);

        let latest: Value = client
            .get(format!("{base}/api/insights"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(latest["Subreddit"], "uberdrivers");
        assert_eq!(latest["Fallback"]["reason"], "missing-id");
    }

    #[tokio::test]
    async fn test_insights_not_found() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let response = reqwest::get(format!("{base}/api/insights?subreddit=lyftdrivers"))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body["error"],
            "No insight data found for subreddit lyftdrivers."
        );
    }

    #[tokio::test]
    async fn test_summary_applies_window() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let body: Value = reqwest::get(format!("{base}/api/insights/summary?range=7D"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["Range"], "7D");
        assert_eq!(body["View"], "raw");
        assert_eq!(
            body["Topics"],
            json!([{"Topic": "Surge pricing", "Mentions": 7}])
        );

        let default_window: Value = reqwest::get(format!("{base}/api/insights/summary"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(default_window["Range"], "1M");
        assert_eq!(
            default_window["Topics"],
            json!([{"Topic": "Surge pricing", "Mentions": 7}])
        );

        let all_year: Value = reqwest::get(format!(
            "{base}/api/insights/summary?start=2024-01-01&end=2025-12-31"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(all_year["Topics"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_summary_rejects_bad_range() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let response = reqwest::get(format!("{base}/api/insights/summary?range=2W"))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        let response = reqwest::get(format!("{base}/api/insights/summary?range=CUSTOM"))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_chat_reply() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/chat"))
            .json(&json!({"messages": [{"role": "user", "content": "hi"}]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["reply"], "Stub reply: hi");
    }

    #[tokio::test]
    async fn test_chat_bad_requests() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let client = reqwest::Client::new();

        let malformed = client
            .post(format!("{base}/api/chat"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status(), 400);
        let body: Value = malformed.json().await.unwrap();
        assert_eq!(body["error"], INVALID_JSON);

        let empty = client
            .post(format!("{base}/api/chat"))
            .json(&json!({"messages": []}))
            .send()
            .await
            .unwrap();
        assert_eq!(empty.status(), 400);
        let body: Value = empty.json().await.unwrap();
        assert_eq!(body["error"], INVALID_MESSAGES);
    }

    #[tokio::test]
    async fn test_chat_upstream_errors() {
        let blank = spawn(state_with_chat(StubChat::with_reply("   "))).await;
        let response = reqwest::Client::new()
            .post(format!("{blank}/api/chat"))
            .json(&json!({"messages": [{"role": "user", "content": "hi"}]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 502);

        let failing = spawn(state_with_chat(StubChat::with_error(ChatError::Timeout))).await;
        let response = reqwest::Client::new()
            .post(format!("{failing}/api/chat"))
            .json(&json!({"messages": [{"role": "user", "content": "hi"}]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], CHAT_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_users_roundtrip() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let client = reqwest::Client::new();

        let created = client
            .post(format!("{base}/api/users"))
            .json(&json!({"name": "Ada", "email": "Ada@Example.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), 201);
        let body: Value = created.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["email"], "ada@example.com");

        let duplicate = client
            .post(format!("{base}/api/users"))
            .json(&json!({"name": "Ada", "email": "ada@example.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(duplicate.status(), 400);
        let body: Value = duplicate.json().await.unwrap();
        assert_eq!(body["success"], false);

        let listed: Value = client
            .get(format!("{base}/api/users"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed["success"], true);
        assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_validation_error() {
        let base = spawn(state_with_chat(StubChat::echo())).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/users"))
            .json(&json!({"email": "a@b.c"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"success": false, "error": "Name is required"}));
    }
}
