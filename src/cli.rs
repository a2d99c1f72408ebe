//! CLI definitions for webask.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// webask CLI.
#[derive(Parser)]
#[command(name = "webask")]
#[command(about = "Ask a web chat assistant through your browser and extract its JSON answer")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WEBASK_CONFIG", default_value = "webask.toml", global = true)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Send a prompt to the chat tab and print the extracted JSON
    Ask(AskArgs),

    /// Show usage examples
    Usage,

    /// Load and validate the configuration file
    CheckConfig,
}

/// Tab targeting mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DriverArg {
    Cdp,
    Applescript,
}

#[derive(Args, Debug, Default)]
pub(crate) struct AskArgs {
    /// The message to send
    pub prompt: String,

    /// URL pattern of the target tab (`re:` prefix for a regex)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Timeout per attempt in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Delay before a retry, in milliseconds
    #[arg(long)]
    pub backoff: Option<u64>,

    /// Interval between response samples, in milliseconds
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Identical samples required to treat the response as complete
    #[arg(long)]
    pub stable_samples: Option<u32>,

    /// Return every JSON object, not just the last one
    #[arg(long)]
    pub all: bool,

    /// Comma-separated fields to request and keep
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Send the prompt as-is, without the JSON format instruction
    #[arg(long)]
    pub no_json_format: bool,

    /// Print the raw page text when no JSON is found
    #[arg(long)]
    pub allow_fallback: bool,

    /// Fail immediately on a CAPTCHA or rate-limit page
    #[arg(long)]
    pub fatal_on_block: bool,

    /// CSS selector of the chat input, focused before pasting
    #[arg(long, env = "CHAT_INPUT_SELECTOR")]
    pub selector: Option<String>,

    /// Save the last captured page HTML here
    #[arg(short, long)]
    pub output_html: Option<PathBuf>,

    /// How tabs are enumerated and focused
    #[arg(long, value_enum)]
    pub driver: Option<DriverArg>,

    /// Chrome DevTools HTTP endpoint, e.g. http://localhost:9222
    #[arg(long, env = "WEBASK_CDP_ENDPOINT")]
    pub cdp_endpoint: Option<String>,

    /// Launch Chrome when nothing answers on the debugging port
    #[arg(long)]
    pub launch: bool,
}

pub(crate) const USAGE: &str = r#"
Examples:
  webask ask "What is the capital of Georgia?"
  webask ask "Who is the CEO of Apple?" --url perplexity.ai --output-html ./perplexity.html
  webask ask "What is the capital of Florida?" --all
  webask ask "Explain quantum computing" --fields question,answer
  webask ask "What's the weather like in Paris?" --no-json-format --allow-fallback
  webask ask "List the planets in our solar system" --timeout 45
  webask ask "Summarize this page" --url 're:^https://chat\.qwen\.ai/c/'
  webask ask "Hello" --launch --cdp-endpoint http://localhost:9333
  webask ask "Hello" --selector 'textarea#chat-input'

Before running, open the chat page in Chrome started with
--remote-debugging-port=9222, or pass --launch.

Exit codes:
  0    success
  1    other failure (configuration, capture, injection)
  2    no tab matches the URL pattern
  3    CAPTCHA or rate-limit page detected
  4    the response did not complete in time
  5    no JSON object found in the response
  130  interrupted
"#;
