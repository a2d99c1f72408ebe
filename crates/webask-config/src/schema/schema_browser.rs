//! Browser, proxy, output and logging configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::default_true;

/// Mechanism used to enumerate tabs and read page state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserDriver {
    /// Chrome DevTools Protocol on a remote-debugging port.
    #[default]
    Cdp,
    /// AppleScript control of Google Chrome (macOS only) for tab targeting.
    Applescript,
}

/// Browser connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub driver: BrowserDriver,

    /// Chrome remote-debugging port.
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    /// Launch Chrome when nothing listens on the debugging port.
    #[serde(default)]
    pub launch: bool,

    /// Chrome executable; discovered from well-known paths when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Profile directory used for a launched Chrome.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,

    #[serde(default)]
    pub headless: bool,

    /// Page opened in a launched Chrome; defaults to the target URL.
    #[serde(default)]
    pub start_url: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            driver: BrowserDriver::default(),
            debug_port: default_debug_port(),
            launch: false,
            chrome_path: None,
            profile_dir: None,
            headless: false,
            start_url: None,
        }
    }
}

impl BrowserConfig {
    /// CDP HTTP endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }

    /// Profile directory, defaulting to `~/.webask/browser-profile`.
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".webask")
                .join("browser-profile")
        })
    }
}

fn default_debug_port() -> u16 {
    9222
}

/// Optional network egress for a launched browser.
///
/// The engine hands these values to the browser untouched and never checks
/// proxy reachability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy endpoint, e.g. `http://brd.superproxy.io:22225`.
    #[serde(default)]
    pub server: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Hosts that bypass the proxy.
    #[serde(default)]
    pub bypass: Vec<String>,

    /// Provider-specific options (e.g. `zone`, `unblocker`), appended to
    /// the username as `-key-value` segments in key order.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl ProxyConfig {
    pub fn is_enabled(&self) -> bool {
        self.server.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Username with provider options folded in.
    pub fn effective_username(&self) -> Option<String> {
        let base = self.username.as_ref()?;
        let mut name = base.clone();
        for (key, value) in &self.options {
            name.push('-');
            name.push_str(key);
            if !value.is_empty() {
                name.push('-');
                name.push_str(value);
            }
        }
        Some(name)
    }
}

/// Debug output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Persist the last snapshot's HTML after every run.
    #[serde(default)]
    pub save_snapshots: bool,

    /// Directory for generated snapshot filenames.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// Pretty-print JSON results.
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_snapshots: false,
            snapshot_dir: default_snapshot_dir(),
            pretty: default_true(),
        }
    }
}

fn default_snapshot_dir() -> String {
    "./snapshots".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Write a rolling log file in addition to stderr.
    #[serde(default = "default_true")]
    pub file: bool,

    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_true(),
            dir: default_log_dir(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "~/.webask/logs".to_string()
}
