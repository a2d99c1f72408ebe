//! DOM snapshot provider over CDP.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, trace};
use webask_protocols::{CaptureError, Session, Snapshot, SnapshotProvider};

use crate::connection::CdpConnection;
use crate::page::{PageExtractor, RenderedPage, default_extractors, select_response};

/// Read-only script evaluated once per capture.
pub const CAPTURE_SCRIPT: &str = r#"(() => ({
  url: location.href,
  html: document.documentElement ? document.documentElement.outerHTML : "",
  text: document.body ? document.body.innerText : ""
}))()"#;

/// Value returned by [`CAPTURE_SCRIPT`].
#[derive(Debug, Clone, Deserialize)]
pub struct CapturePayload {
    pub url: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub text: String,
}

/// [`SnapshotProvider`] that evaluates one script per capture and selects
/// the response region with page extractor strategies.
pub struct CdpSnapshotProvider {
    connection: Arc<CdpConnection>,
    extractors: Vec<Box<dyn PageExtractor>>,
}

impl CdpSnapshotProvider {
    pub fn new(connection: Arc<CdpConnection>) -> Self {
        Self {
            connection,
            extractors: default_extractors(),
        }
    }

    /// Replace the strategy list; strategies are tried in the given order.
    pub fn with_extractors(mut self, extractors: Vec<Box<dyn PageExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }
}

#[async_trait]
impl SnapshotProvider for CdpSnapshotProvider {
    async fn capture(&self, session: &Session) -> Result<Snapshot, CaptureError> {
        let tab_id = session.handle.tab_id.as_str();
        let page = self
            .connection
            .session(tab_id)
            .await
            .map_err(|e| CaptureError::AttachFailed(format!("{}: {}", tab_id, e)))?;

        let value = match page.evaluate(CAPTURE_SCRIPT).await {
            Ok(value) => value,
            Err(e) => {
                if e.is_target_gone() {
                    self.connection.forget(tab_id).await;
                }
                return Err(e.into());
            }
        };

        let payload: CapturePayload = serde_json::from_value(value)
            .map_err(|e| CaptureError::InvalidPayload(e.to_string()))?;
        trace!(
            url = %payload.url,
            html_bytes = payload.html.len(),
            text_bytes = payload.text.len(),
            "Captured page"
        );
        Ok(build_snapshot(payload, &self.extractors))
    }
}

/// Turn a capture payload into a snapshot, attaching the response region
/// the first matching strategy finds and the page's notice text.
pub fn build_snapshot(payload: CapturePayload, extractors: &[Box<dyn PageExtractor>]) -> Snapshot {
    let (region, notice) = {
        let page = RenderedPage::parse(&payload.url, &payload.html, &payload.text);
        let notice = (!payload.html.trim().is_empty()).then(|| page.notice_text());
        (select_response(&page, extractors), notice)
    };
    let mut snapshot = Snapshot::new(payload.url, payload.text, payload.html);
    if let Some(notice) = notice {
        snapshot = snapshot.with_notice_text(notice);
    }
    match region {
        Some((layout, region)) => {
            debug!(?layout, chars = region.text.len(), turns = ?region.turns, "Selected response region");
            let snapshot = snapshot.with_response(layout, region.text);
            match region.turns {
                Some(turns) => snapshot.with_turns(turns),
                None => snapshot,
            }
        }
        None => snapshot,
    }
}
