//! Chat completion provider adapters

pub mod azure;
pub mod lazy;
pub mod openai;
pub mod stub;

pub use azure::AzureOpenAiChat;
pub use lazy::{ChatFactory, LazyChatCompleter};
pub use openai::OpenAiChat;
pub use stub::StubChat;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subreddit_insights_domain::{ChatError, ChatMessage};

/// Common chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatClientConfig {
    /// Model name (OpenAI) or deployment name (Azure)
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

pub(crate) fn build_http_client(config: &ChatClientConfig) -> Result<Client, ChatError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ChatError::Config(format!("Failed to build HTTP client: {}", e)))
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Send a prepared chat-completions request and pull out
/// `choices[0].message.content`. A missing content is returned as an empty
/// string so callers can report it as an empty reply.
pub(crate) async fn send_chat_request(request: RequestBuilder) -> Result<String, ChatError> {
    let response = request
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ChatError::Timeout
            } else {
                ChatError::Api(e.to_string())
            }
        })?;

    if response.status() == 429 {
        return Err(ChatError::RateLimited);
    }

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::Api(format!("API returned {}: {}", status, body)));
    }

    let api_response: ChatCompletionResponse = response
        .json()
        .await
        .map_err(|e| ChatError::InvalidFormat(e.to_string()))?;

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::InvalidFormat("Response has no choices".to_string()))?;

    Ok(choice.message.content.unwrap_or_default())
}
