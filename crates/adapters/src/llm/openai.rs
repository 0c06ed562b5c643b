//! OpenAI chat completions adapter

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use subreddit_insights_domain::{ChatCompleter, ChatError, ChatMessage};

use super::{ChatClientConfig, ChatCompletionRequest, build_http_client, send_chat_request};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat client for OpenAI and OpenAI-compatible endpoints
pub struct OpenAiChat {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: ChatClientConfig,
}

impl OpenAiChat {
    pub fn new(api_key: SecretString, config: ChatClientConfig) -> Result<Self, ChatError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string(), config)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        config: ChatClientConfig,
    ) -> Result<Self, ChatError> {
        Ok(Self {
            client: build_http_client(&config)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }
}

#[async_trait]
impl ChatCompleter for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
        };

        let url = format!("{}/chat/completions", self.base_url);

        send_chat_request(
            self.client
                .post(&url)
                .header(
                    "Authorization",
                    format!("Bearer {}", self.api_key.expose_secret()),
                )
                .json(&request),
        )
        .await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
