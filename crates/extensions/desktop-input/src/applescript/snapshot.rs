//! Page snapshots through Chrome's `execute javascript`.

use async_trait::async_trait;
use tracing::trace;
use webask_browser_cdp::PageExtractor;
use webask_browser_cdp::page::default_extractors;
use webask_browser_cdp::snapshot::{CAPTURE_SCRIPT, CapturePayload, build_snapshot};
use webask_protocols::{CaptureError, Session, Snapshot, SnapshotProvider, TabHandle};

use super::{DEFAULT_APP, quote, run_osascript, tab_address};

/// [`SnapshotProvider`] for tabs found by [`super::AppleScriptTabSource`].
///
/// Runs the same read-only capture script as the CDP provider, serialized
/// to a string, and selects the response region with the same strategies.
pub struct AppleScriptSnapshotProvider {
    app: String,
    extractors: Vec<Box<dyn PageExtractor>>,
}

impl Default for AppleScriptSnapshotProvider {
    fn default() -> Self {
        Self::new(DEFAULT_APP)
    }
}

impl AppleScriptSnapshotProvider {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            extractors: default_extractors(),
        }
    }

    pub fn with_extractors(mut self, extractors: Vec<Box<dyn PageExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }
}

#[async_trait]
impl SnapshotProvider for AppleScriptSnapshotProvider {
    async fn capture(&self, session: &Session) -> Result<Snapshot, CaptureError> {
        if !cfg!(target_os = "macos") {
            return Err(CaptureError::AttachFailed(
                "AppleScript capture is only available on macOS".to_string(),
            ));
        }
        let script = capture_script(&self.app, &session.handle).map_err(CaptureError::AttachFailed)?;
        let output = run_osascript(&script)
            .await
            .map_err(|e| classify_failure(&session.handle, e))?;
        let payload = parse_payload(&output)?;
        trace!(
            url = %payload.url,
            html_bytes = payload.html.len(),
            "Captured page via AppleScript"
        );
        Ok(build_snapshot(payload, &self.extractors))
    }
}

/// Script evaluating the capture script in `tab` and returning its JSON.
pub fn capture_script(app: &str, tab: &TabHandle) -> Result<String, String> {
    let (window_id, tab_index) = tab_address(tab)?;
    let js = format!("JSON.stringify({})", CAPTURE_SCRIPT.replace('\n', " "));
    Ok(format!(
        r#"tell application {app}
    set t to tab {tab_index} of window id {window_id}
    return execute t javascript {js}
end tell"#,
        app = quote(app),
        js = quote(&js)
    ))
}

fn parse_payload(output: &str) -> Result<CapturePayload, CaptureError> {
    let output = output.trim();
    if output.is_empty() || output == "missing value" {
        return Err(CaptureError::InvalidPayload(
            "empty result; is JavaScript from Apple Events allowed?".to_string(),
        ));
    }
    serde_json::from_str(output).map_err(|e| CaptureError::InvalidPayload(e.to_string()))
}

fn classify_failure(tab: &TabHandle, message: String) -> CaptureError {
    // Error -1719 is "Invalid index", -1728 "Can't get": the tab is gone.
    if message.contains("-1719") || message.contains("-1728") {
        CaptureError::PageClosed(format!("{}:{}", tab.window_id, tab.tab_id))
    } else {
        CaptureError::Script(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab() -> TabHandle {
        TabHandle::new("101", "2", "https://chat.qwen.ai/c/1")
    }

    #[test]
    fn test_capture_script_addresses_tab() {
        let script = capture_script(DEFAULT_APP, &tab()).unwrap();
        assert!(script.contains("set t to tab 2 of window id 101"));
        assert!(script.contains("execute t javascript \"JSON.stringify("));
        // The embedded script is a single AppleScript string literal.
        assert_eq!(script.lines().count(), 4);
        assert!(script.contains(r#"html: document.documentElement ? document.documentElement.outerHTML : \"\""#));
    }

    #[test]
    fn test_capture_script_rejects_cdp_ids() {
        let cdp_tab = TabHandle::new("default", "E3B0C442", "https://x/");
        assert!(capture_script(DEFAULT_APP, &cdp_tab).is_err());
    }

    #[test]
    fn test_parse_payload() {
        let payload = parse_payload(
            "{\"url\":\"https://chat.qwen.ai/c/1\",\"html\":\"<p>hi</p>\",\"text\":\"hi\"}\n",
        )
        .unwrap();
        assert_eq!(payload.url, "https://chat.qwen.ai/c/1");
        assert_eq!(payload.text, "hi");
    }

    #[test]
    fn test_parse_payload_missing_value() {
        assert!(matches!(
            parse_payload("missing value"),
            Err(CaptureError::InvalidPayload(_))
        ));
        assert!(matches!(parse_payload("not json"), Err(CaptureError::InvalidPayload(_))));
    }

    #[test]
    fn test_closed_tab_is_page_closed() {
        let err = classify_failure(
            &tab(),
            "execution error: Google Chrome got an error: Can't get tab 2 of window id 101. (-1728)".to_string(),
        );
        assert_eq!(err, CaptureError::PageClosed("101:2".to_string()));

        let err = classify_failure(&tab(), "Executing JavaScript through AppleScript is turned off".to_string());
        assert!(matches!(err, CaptureError::Script(_)));
    }
}
