//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_browser;
mod schema_engine;

pub use schema_browser::*;
pub use schema_engine::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ask: AskConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub injector: InjectorConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default chat page targeted when no URL is given.
pub const DEFAULT_TARGET_URL: &str = "https://chat.qwen.ai/";

/// Ask run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskConfig {
    /// URL pattern of the target tab (`re:` prefix for a regex).
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum number of attempts per run.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Time budget of one attempt, in seconds.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_seconds: u64,

    /// Delay before a retry, in milliseconds.
    #[serde(default = "default_backoff")]
    pub backoff_ms: u64,

    /// Return every recovered object instead of only the last.
    #[serde(default)]
    pub return_all: bool,

    /// Fields to request from the assistant and keep in results.
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Append a JSON formatting instruction to the prompt.
    #[serde(default = "default_true")]
    pub json_format: bool,

    /// Accept raw page text when no JSON can be recovered.
    #[serde(default)]
    pub allow_fallback: bool,

    /// Retry after a CAPTCHA or rate-limit page instead of failing at once.
    #[serde(default = "default_true")]
    pub retry_on_block: bool,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_attempts: default_max_attempts(),
            attempt_timeout_seconds: default_attempt_timeout(),
            backoff_ms: default_backoff(),
            return_all: false,
            fields: default_fields(),
            json_format: default_true(),
            allow_fallback: false,
            retry_on_block: default_true(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_attempt_timeout() -> u64 {
    30
}

fn default_backoff() -> u64 {
    2000
}

fn default_fields() -> Vec<String> {
    vec![
        "question".to_string(),
        "thinking".to_string(),
        "answer".to_string(),
    ]
}

/// Response polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between samples, in milliseconds.
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Consecutive identical samples that mark a response as complete.
    #[serde(default = "default_stable_samples")]
    pub stable_samples: u32,

    /// Consecutive capture failures tolerated before the attempt fails.
    #[serde(default = "default_capture_errors")]
    pub max_consecutive_capture_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            stable_samples: default_stable_samples(),
            max_consecutive_capture_errors: default_capture_errors(),
        }
    }
}

fn default_interval() -> u64 {
    2000
}

fn default_stable_samples() -> u32 {
    2
}

fn default_capture_errors() -> u32 {
    3
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
