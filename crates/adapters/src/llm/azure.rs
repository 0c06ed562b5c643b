//! Azure OpenAI chat completions adapter

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use subreddit_insights_domain::{ChatCompleter, ChatError, ChatMessage};

use super::{ChatClientConfig, ChatCompletionRequest, build_http_client, send_chat_request};

pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-5-mini";

/// Chat client for an Azure OpenAI deployment
pub struct AzureOpenAiChat {
    client: Client,
    api_key: SecretString,
    endpoint: String,
    api_version: String,
    config: ChatClientConfig,
}

impl AzureOpenAiChat {
    /// `config.model` is the deployment name
    pub fn new(
        api_key: SecretString,
        endpoint: String,
        api_version: Option<String>,
        config: ChatClientConfig,
    ) -> Result<Self, ChatError> {
        if endpoint.trim().is_empty() {
            return Err(ChatError::Config("Azure endpoint is not set".to_string()));
        }

        Ok(Self {
            client: build_http_client(&config)?,
            api_key,
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            api_version: api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            config,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.config.model
        )
    }
}

#[async_trait]
impl ChatCompleter for AzureOpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
        };

        send_chat_request(
            self.client
                .post(self.url())
                .query(&[("api-version", self.api_version.as_str())])
                .header("api-key", self.api_key.expose_secret())
                .json(&request),
        )
        .await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
