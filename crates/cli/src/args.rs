//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// subreddit-insights: serve and query topic insights mined from Reddit threads
#[derive(Parser, Debug)]
#[command(name = "subreddit-insights")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Query insights for a subreddit
    Query(QueryArgs),

    /// Load exported insight documents into the store
    Import(ImportArgs),

    /// Send one message to the configured chat model
    Chat(ChatArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides [server].bind)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum)]
pub enum InsightView {
    #[default]
    Raw,
    Filtered,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Subreddit name (defaults to [general].default_subreddit)
    #[arg(long)]
    pub subreddit: Option<String>,

    /// Document id to prefer
    #[arg(long)]
    pub id: Option<String>,

    /// Which insight list to show
    #[arg(long, value_enum, default_value_t = InsightView::Raw)]
    pub view: InsightView,

    /// Date range: 1D, 3D, 7D, 1M, 3M, 6M, 1Y or CUSTOM
    #[arg(long)]
    pub range: Option<String>,

    /// Custom range start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Custom range end date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Show the N topics with the most mentions
    #[arg(long)]
    pub top: Option<usize>,

    /// Output the full response as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Export file (JSON array, single object, or JSON lines)
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// User message to send
    #[arg(long)]
    pub message: String,

    /// Optional system prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}
