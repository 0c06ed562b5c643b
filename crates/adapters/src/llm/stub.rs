//! Stub chat completer for testing and offline mode

use async_trait::async_trait;
use subreddit_insights_domain::{ChatCompleter, ChatError, ChatMessage, ChatRole};

/// Stub chat completer that returns configurable replies
pub struct StubChat {
    reply: Option<String>,
    error: Option<ChatError>,
}

impl StubChat {
    /// Always reply with the given text
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            error: None,
        }
    }

    /// Always fail with the given error
    pub fn with_error(error: ChatError) -> Self {
        Self {
            reply: None,
            error: Some(error),
        }
    }

    /// Echo the last user message back
    pub fn echo() -> Self {
        Self {
            reply: None,
            error: None,
        }
    }
}

impl Default for StubChat {
    fn default() -> Self {
        Self::echo()
    }
}

#[async_trait]
impl ChatCompleter for StubChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        if let Some(ref error) = self.error {
            return Err(match error {
                ChatError::InvalidRequest(msg) => ChatError::InvalidRequest(msg.clone()),
                ChatError::EmptyReply => ChatError::EmptyReply,
                ChatError::Api(msg) => ChatError::Api(msg.clone()),
                ChatError::InvalidFormat(msg) => ChatError::InvalidFormat(msg.clone()),
                ChatError::RateLimited => ChatError::RateLimited,
                ChatError::Timeout => ChatError::Timeout,
                ChatError::Config(msg) => ChatError::Config(msg.clone()),
            });
        }

        if let Some(ref reply) = self.reply {
            return Ok(reply.clone());
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("Stub reply: {}", last_user))
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}
