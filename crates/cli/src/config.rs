//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use subreddit_insights_adapters::llm::ChatClientConfig;
use subreddit_insights_domain::usecases::{DEFAULT_SUBREDDIT, MapperConfig, QueryConfig};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub insights: InsightsConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_subreddit")]
    pub default_subreddit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    #[serde(default = "default_true")]
    pub hourly_histogram: bool,

    #[serde(default)]
    pub daily_histogram: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub azure: AzureConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_azure_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_azure_api_version")]
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_subreddit() -> String {
    DEFAULT_SUBREDDIT.to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./insights.sqlite")
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "azure".to_string()
}

fn default_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_azure_api_key_env() -> String {
    "AZURE_OPENAI_API_KEY".to_string()
}

fn default_azure_api_version() -> String {
    "2024-12-01-preview".to_string()
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_subreddit: default_subreddit(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            hourly_histogram: default_true(),
            daily_histogram: false,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            timeout_secs: default_timeout(),
            azure: AzureConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key_env: default_azure_api_key_env(),
            api_version: default_azure_api_version(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_api_key_env(),
            base_url: default_openai_base_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("SUBREDDIT_INSIGHTS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            default_subreddit: self.general.default_subreddit.clone(),
            mapper: MapperConfig {
                hourly_histogram: self.insights.hourly_histogram,
                daily_histogram: self.insights.daily_histogram,
            },
        }
    }

    pub fn chat_client_config(&self) -> ChatClientConfig {
        ChatClientConfig {
            model: self.chat.model.clone(),
            timeout_secs: self.chat.timeout_secs,
        }
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# subreddit-insights configuration

[general]
log_level = "info"
# Served when a request names no subreddit
default_subreddit = "uberdrivers"

[store]
db_path = "./insights.sqlite"

[server]
bind = "127.0.0.1:3000"

[insights]
hourly_histogram = true
daily_histogram = false

[chat]
provider = "azure"  # azure, openai, stub
model = "gpt-5-mini"  # deployment name for azure
timeout_secs = 60

[chat.azure]
endpoint = "https://your-resource.cognitiveservices.azure.com/"
api_key_env = "AZURE_OPENAI_API_KEY"
api_version = "2024-12-01-preview"

[chat.openai]
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"
"#
        .to_string()
    }
}
