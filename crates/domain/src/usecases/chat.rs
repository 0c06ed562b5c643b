//! Chat use case - thin proxy to the configured chat model

use std::sync::Arc;

use crate::{
    model::ChatMessage,
    ports::{ChatCompleter, ChatError},
};

/// Use case for answering a chat conversation
pub struct ChatUseCase<C: ChatCompleter + ?Sized> {
    completer: Arc<C>,
}

impl<C: ChatCompleter + ?Sized> ChatUseCase<C> {
    pub fn new(completer: Arc<C>) -> Self {
        Self { completer }
    }

    /// Forward the conversation and return the trimmed reply
    pub async fn reply(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        if messages.is_empty() {
            return Err(ChatError::InvalidRequest(
                "messages must be a non-empty array.".to_string(),
            ));
        }

        tracing::debug!(
            model = %self.completer.model_name(),
            message_count = messages.len(),
            "Requesting chat completion"
        );

        let reply = self.completer.complete(messages).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            tracing::warn!(model = %self.completer.model_name(), "Model returned empty reply");
            return Err(ChatError::EmptyReply);
        }

        Ok(reply.to_string())
    }
}
