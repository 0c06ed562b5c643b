//! Lazily-built chat client shared across requests

use async_trait::async_trait;
use std::sync::Arc;
use subreddit_insights_domain::{ChatCompleter, ChatError, ChatMessage};
use tokio::sync::OnceCell;

/// Builds the real client; called until it first succeeds
pub type ChatFactory = Box<dyn Fn() -> Result<Arc<dyn ChatCompleter>, ChatError> + Send + Sync>;

/// Holds one chat client for the life of the process.
///
/// The client is built on first use so a missing API key only fails chat
/// requests, not startup. A failed build is reported to that request and
/// attempted again on the next one.
pub struct LazyChatCompleter {
    cell: OnceCell<Arc<dyn ChatCompleter>>,
    factory: ChatFactory,
    label: String,
}

impl LazyChatCompleter {
    pub fn new(label: impl Into<String>, factory: ChatFactory) -> Self {
        Self {
            cell: OnceCell::new(),
            factory,
            label: label.into(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    async fn client(&self) -> Result<&Arc<dyn ChatCompleter>, ChatError> {
        self.cell
            .get_or_try_init(|| async {
                tracing::debug!(model = %self.label, "Initializing chat client");
                (self.factory)()
            })
            .await
    }
}

#[async_trait]
impl ChatCompleter for LazyChatCompleter {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        self.client().await?.complete(messages).await
    }

    fn model_name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::StubChat;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use subreddit_insights_domain::ChatRole;

    fn hello() -> Vec<ChatMessage> {
        vec![ChatMessage::new(ChatRole::User, "hello")]
    }

    #[tokio::test]
    async fn test_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = builds.clone();
        let lazy = LazyChatCompleter::new(
            "stub",
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(StubChat::with_reply("hi")) as Arc<dyn ChatCompleter>)
            }),
        );

        assert!(!lazy.is_initialized());
        assert_eq!(lazy.complete(&hello()).await.unwrap(), "hi");
        assert_eq!(lazy.complete(&hello()).await.unwrap(), "hi");
        assert!(lazy.is_initialized());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_build_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let lazy = LazyChatCompleter::new(
            "azure",
            Box::new(move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ChatError::Config("missing key".to_string()))
                } else {
                    Ok(Arc::new(StubChat::echo()) as Arc<dyn ChatCompleter>)
                }
            }),
        );

        assert!(matches!(
            lazy.complete(&hello()).await,
            Err(ChatError::Config(_))
        ));
        assert!(!lazy.is_initialized());

        assert_eq!(lazy.complete(&hello()).await.unwrap(), "Stub reply: hello");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
