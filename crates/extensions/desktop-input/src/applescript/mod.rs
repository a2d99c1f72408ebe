//! Chrome control through AppleScript (macOS only).
//!
//! Tabs are addressed by window id and 1-based tab index. Page reads use
//! Chrome's `execute javascript`, which requires "Allow JavaScript from
//! Apple Events" in the browser's developer menu.

mod snapshot;
mod tabs;

pub use snapshot::{AppleScriptSnapshotProvider, capture_script};
pub use tabs::{
    AppleScriptTabSource, activate_script, focus_input_script, list_script, parse_tab_listing,
};

use webask_protocols::{TabHandle, TabSourceError};

pub const DEFAULT_APP: &str = "Google Chrome";

fn ensure_supported() -> Result<(), TabSourceError> {
    if cfg!(target_os = "macos") {
        Ok(())
    } else {
        Err(TabSourceError::PlatformNotSupported)
    }
}

#[cfg(target_os = "macos")]
async fn run_osascript(script: &str) -> Result<String, String> {
    let output = tokio::process::Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .await
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(not(target_os = "macos"))]
async fn run_osascript(_script: &str) -> Result<String, String> {
    Err("osascript is only available on macOS".to_string())
}

/// AppleScript string literal.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Numeric window id and tab index of a handle from [`AppleScriptTabSource`].
fn tab_address(tab: &TabHandle) -> Result<(i64, u32), String> {
    let window_id: i64 = tab
        .window_id
        .parse()
        .map_err(|_| format!("invalid window id '{}'", tab.window_id))?;
    let tab_index: u32 = tab
        .tab_id
        .parse()
        .ok()
        .filter(|i| *i > 0)
        .ok_or_else(|| format!("invalid tab index '{}'", tab.tab_id))?;
    Ok((window_id, tab_index))
}
