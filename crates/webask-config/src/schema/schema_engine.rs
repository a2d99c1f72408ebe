//! Input injection and block detection configuration.

use serde::{Deserialize, Serialize};

/// Clipboard/keystroke injection timing and key bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectorConfig {
    /// Wait after setting the clipboard, in milliseconds.
    #[serde(default = "default_clipboard_settle")]
    pub clipboard_settle_ms: u64,

    /// Wait after focusing the tab before pasting, in milliseconds.
    #[serde(default = "default_focus_settle")]
    pub focus_settle_ms: u64,

    /// Wait between paste and submit, in milliseconds.
    #[serde(default = "default_submit_settle")]
    pub submit_settle_ms: u64,

    /// Paste chord, e.g. `"meta+v"`.
    #[serde(default = "default_paste_chord")]
    pub paste_chord: String,

    /// Submit key.
    #[serde(default = "default_submit_key")]
    pub submit_key: String,

    /// CSS selector of the chat input, focused inside the page before
    /// pasting. Unset relies on the page's own focus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_selector: Option<String>,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            clipboard_settle_ms: default_clipboard_settle(),
            focus_settle_ms: default_focus_settle(),
            submit_settle_ms: default_submit_settle(),
            paste_chord: default_paste_chord(),
            submit_key: default_submit_key(),
            input_selector: None,
        }
    }
}

fn default_clipboard_settle() -> u64 {
    200
}

fn default_focus_settle() -> u64 {
    500
}

fn default_submit_settle() -> u64 {
    300
}

/// Platform paste shortcut.
pub fn default_paste_chord() -> String {
    if cfg!(target_os = "macos") {
        "meta+v".to_string()
    } else {
        "ctrl+v".to_string()
    }
}

fn default_submit_key() -> String {
    "enter".to_string()
}

/// Block detector marker overrides.
///
/// `None` keeps the built-in marker sets; extra patterns are appended to
/// whichever set is active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Replacement challenge markers.
    #[serde(default)]
    pub challenge_patterns: Option<Vec<String>>,

    /// Replacement rate-limit markers.
    #[serde(default)]
    pub rate_limit_patterns: Option<Vec<String>>,

    /// Additional challenge markers.
    #[serde(default)]
    pub extra_challenge_patterns: Vec<String>,

    /// Additional rate-limit markers.
    #[serde(default)]
    pub extra_rate_limit_patterns: Vec<String>,
}
