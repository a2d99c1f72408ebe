//! Browser-facing adapter traits.

use async_trait::async_trait;

use crate::error::{CaptureError, TabSourceError};
use crate::types::{BrowserWindow, Session, Snapshot, TabHandle};

/// Enumerates open browser windows and activates tabs.
#[async_trait]
pub trait TabSource: Send + Sync {
    /// List windows front-to-back, each with its tabs in native order.
    async fn list_windows(&self) -> Result<Vec<BrowserWindow>, TabSourceError>;

    /// Bring the tab's window to the foreground with the tab selected.
    async fn activate(&self, tab: &TabHandle) -> Result<(), TabSourceError>;

    /// Focus the first element matching the CSS `selector` inside the tab's
    /// page. `Ok(false)` when nothing matches.
    async fn focus_input(&self, tab: &TabHandle, selector: &str) -> Result<bool, TabSourceError>;
}

/// Captures read-only observations of a session's page.
///
/// Implementations evaluate exactly once per call and never retry or
/// mutate page state.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn capture(&self, session: &Session) -> Result<Snapshot, CaptureError>;
}
