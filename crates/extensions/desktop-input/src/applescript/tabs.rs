//! Tab enumeration and activation.
//!
//! Tabs come back in native order: windows front to back, tabs left to
//! right.

use async_trait::async_trait;
use tracing::debug;
use webask_browser_cdp::tabs::focus_script;
use webask_protocols::{BrowserWindow, TabHandle, TabSource, TabSourceError};

use super::{DEFAULT_APP, ensure_supported, quote, run_osascript, tab_address};

/// Field separator in the listing script's output.
const FIELD_SEP: char = '\u{1f}';

/// [`TabSource`] that drives a Chromium-family browser over `osascript`.
#[derive(Debug, Clone)]
pub struct AppleScriptTabSource {
    app: String,
}

impl Default for AppleScriptTabSource {
    fn default() -> Self {
        Self::new(DEFAULT_APP)
    }
}

impl AppleScriptTabSource {
    /// `app` is the application name AppleScript addresses, e.g. "Chromium".
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into() }
    }

    pub fn app(&self) -> &str {
        &self.app
    }
}

#[async_trait]
impl TabSource for AppleScriptTabSource {
    async fn list_windows(&self) -> Result<Vec<BrowserWindow>, TabSourceError> {
        ensure_supported()?;
        let output = run_osascript(&list_script(&self.app))
            .await
            .map_err(TabSourceError::ListFailed)?;
        let windows = parse_tab_listing(&output);
        debug!(
            windows = windows.len(),
            tabs = windows.iter().map(|w| w.tabs.len()).sum::<usize>(),
            "Listed tabs via AppleScript"
        );
        Ok(windows)
    }

    async fn activate(&self, tab: &TabHandle) -> Result<(), TabSourceError> {
        ensure_supported()?;
        let failed = |message| TabSourceError::ActivateFailed {
            tab_id: tab.tab_id.clone(),
            message,
        };
        let script = activate_script(&self.app, tab).map_err(failed)?;
        run_osascript(&script).await.map(|_| ()).map_err(failed)
    }

    async fn focus_input(&self, tab: &TabHandle, selector: &str) -> Result<bool, TabSourceError> {
        ensure_supported()?;
        let failed = |message| TabSourceError::FocusFailed {
            tab_id: tab.tab_id.clone(),
            message,
        };
        let script = focus_input_script(&self.app, tab, selector).map_err(failed)?;
        let output = run_osascript(&script).await.map_err(failed)?;
        Ok(output.trim() == "true")
    }
}

/// Script printing one line per tab: window id, tab index, URL, title.
pub fn list_script(app: &str) -> String {
    format!(
        r#"set sep to (ASCII character 31)
set out to ""
tell application {app}
    repeat with w in windows
        set tabIndex to 0
        repeat with t in tabs of w
            set tabIndex to tabIndex + 1
            set out to out & (id of w) & sep & tabIndex & sep & (URL of t) & sep & (title of t) & linefeed
        end repeat
    end repeat
end tell
return out"#,
        app = quote(app)
    )
}

/// Script selecting `tab` in its window and raising that window.
pub fn activate_script(app: &str, tab: &TabHandle) -> Result<String, String> {
    let (window_id, tab_index) = tab_address(tab)?;
    Ok(format!(
        r#"tell application {app}
    set w to window id {window_id}
    set active tab index of w to {tab_index}
    set index of w to 1
    activate
end tell"#,
        app = quote(app)
    ))
}

/// Script focusing the element matching `selector` inside `tab`; prints
/// `true` when one was found.
pub fn focus_input_script(app: &str, tab: &TabHandle, selector: &str) -> Result<String, String> {
    let (window_id, tab_index) = tab_address(tab)?;
    Ok(format!(
        r#"tell application {app}
    set t to tab {tab_index} of window id {window_id}
    return execute t javascript {js}
end tell"#,
        app = quote(app),
        js = quote(&focus_script(selector))
    ))
}

/// Parse the listing script's output, keeping windows in first-seen order.
pub fn parse_tab_listing(output: &str) -> Vec<BrowserWindow> {
    let mut windows: Vec<BrowserWindow> = Vec::new();

    for line in output.lines() {
        let mut fields = line.splitn(4, FIELD_SEP);
        let (Some(window_id), Some(tab_index), Some(url)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let window_id = window_id.trim();
        let tab_index = tab_index.trim();
        if window_id.is_empty() || tab_index.parse::<u32>().is_err() {
            continue;
        }
        let title = fields.next().unwrap_or("").trim();
        let handle = TabHandle::new(window_id, tab_index, url.trim()).with_title(title);

        match windows.iter_mut().find(|w| w.id == window_id) {
            Some(window) => window.tabs.push(handle),
            None => windows.push(BrowserWindow {
                id: window_id.to_string(),
                tabs: vec![handle],
            }),
        }
    }

    windows
}

#[cfg(test)]
#[path = "tabs_tests.rs"]
mod tests;
