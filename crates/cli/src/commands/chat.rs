//! Chat command - send one message to the configured model

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use subreddit_insights_adapters::llm::{
    AzureOpenAiChat, ChatFactory, LazyChatCompleter, OpenAiChat, StubChat,
};
use subreddit_insights_domain::usecases::ChatUseCase;
use subreddit_insights_domain::{ChatCompleter, ChatError, ChatMessage, ChatRole};

use crate::args::ChatArgs;
use crate::config::AppConfig;

#[derive(Serialize)]
struct ChatOutput<'a> {
    model: &'a str,
    reply: &'a str,
}

pub async fn execute(args: ChatArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let completer = build_chat_completer(&config)?;
    let model = completer.model_name().to_string();
    let chat = ChatUseCase::new(completer);

    let mut messages = Vec::new();
    if let Some(system) = args.system {
        messages.push(ChatMessage::new(ChatRole::System, system));
    }
    messages.push(ChatMessage::new(ChatRole::User, args.message));

    let reply = chat.reply(&messages).await.context("Chat request failed")?;

    if args.json {
        let output = ChatOutput {
            model: &model,
            reply: &reply,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", reply);
    }

    Ok(())
}

/// Build the chat completer named by `[chat].provider`.
///
/// Remote clients are built lazily so a missing key only fails chat requests.
pub(crate) fn build_chat_completer(config: &AppConfig) -> Result<Arc<dyn ChatCompleter>> {
    let client_config = config.chat_client_config();

    let factory: ChatFactory = match config.chat.provider.as_str() {
        "stub" => return Ok(Arc::new(StubChat::echo())),
        "azure" => {
            let azure = config.chat.azure.clone();
            Box::new(move || -> Result<Arc<dyn ChatCompleter>, ChatError> {
                let api_key = load_api_key(&azure.api_key_env, "azure")
                    .map_err(|e| ChatError::Config(e.to_string()))?;
                let client = AzureOpenAiChat::new(
                    api_key,
                    azure.endpoint.clone(),
                    Some(azure.api_version.clone()),
                    client_config.clone(),
                )?;
                Ok(Arc::new(client))
            })
        }
        "openai" => {
            let openai = config.chat.openai.clone();
            Box::new(move || -> Result<Arc<dyn ChatCompleter>, ChatError> {
                let api_key = load_api_key(&openai.api_key_env, "openai")
                    .map_err(|e| ChatError::Config(e.to_string()))?;
                let client =
                    OpenAiChat::with_base_url(api_key, openai.base_url.clone(), client_config.clone())?;
                Ok(Arc::new(client))
            })
        }
        other => bail!("Unknown chat provider: {}", other),
    };

    Ok(Arc::new(LazyChatCompleter::new(
        config.chat.model.clone(),
        factory,
    )))
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for provider {}", provider);
    }

    let key = std::env::var(env_var).with_context(|| {
        format!(
            "Missing API key env var {} for provider {}",
            env_var, provider
        )
    })?;

    if key.trim().is_empty() {
        bail!(
            "API key env var {} is empty for provider {}",
            env_var,
            provider
        );
    }

    Ok(SecretString::new(key.into()))
}
