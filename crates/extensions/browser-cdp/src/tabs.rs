//! Tab enumeration and activation over CDP.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use webask_protocols::{BrowserWindow, TabHandle, TabSource, TabSourceError};

use crate::cdp::PageInfo;
use crate::connection::CdpConnection;

/// Window id used when window membership cannot be resolved.
pub const UNKNOWN_WINDOW: &str = "default";

/// [`TabSource`] over a Chrome debugging port.
///
/// Tabs come from `/json/list`, which reports the most recently focused
/// tab first; they are grouped into windows through
/// `Browser.getWindowForTarget`. When the browser socket is unreachable all
/// tabs land in one window.
pub struct CdpTabSource {
    connection: Arc<CdpConnection>,
}

impl CdpTabSource {
    pub fn new(connection: Arc<CdpConnection>) -> Self {
        Self { connection }
    }

    async fn window_ids(&self, pages: &[PageInfo]) -> Vec<Option<i64>> {
        let client = match self.connection.client().await {
            Ok(client) => client,
            Err(e) => {
                debug!("Window lookup unavailable, grouping tabs together: {}", e);
                return vec![None; pages.len()];
            }
        };

        let mut ids = Vec::with_capacity(pages.len());
        for page in pages {
            match client.window_for_target(&page.id).await {
                Ok(id) => ids.push(Some(id)),
                Err(e) => {
                    debug!(target_id = %page.id, "Window lookup failed: {}", e);
                    ids.push(None);
                }
            }
        }
        ids
    }
}

#[async_trait]
impl TabSource for CdpTabSource {
    async fn list_windows(&self) -> Result<Vec<BrowserWindow>, TabSourceError> {
        let pages: Vec<PageInfo> = self
            .connection
            .endpoint()
            .list_pages()
            .await?
            .into_iter()
            .filter(PageInfo::is_tab)
            .collect();
        let ids = self.window_ids(&pages).await;
        let windows = group_by_window(&pages, &ids);
        debug!(
            windows = windows.len(),
            tabs = pages.len(),
            "Listed browser tabs"
        );
        Ok(windows)
    }

    async fn activate(&self, tab: &TabHandle) -> Result<(), TabSourceError> {
        self.connection
            .endpoint()
            .activate(&tab.tab_id)
            .await
            .map_err(|e| TabSourceError::ActivateFailed {
                tab_id: tab.tab_id.clone(),
                message: e.to_string(),
            })
    }

    async fn focus_input(&self, tab: &TabHandle, selector: &str) -> Result<bool, TabSourceError> {
        let failed = |message: String| TabSourceError::FocusFailed {
            tab_id: tab.tab_id.clone(),
            message,
        };
        let page = self
            .connection
            .session(&tab.tab_id)
            .await
            .map_err(|e| failed(e.to_string()))?;
        let value = page
            .evaluate(&focus_script(selector))
            .await
            .map_err(|e| failed(e.to_string()))?;
        let found = value.as_bool().unwrap_or(false);
        debug!(tab = %tab.tab_id, selector, found, "Focused chat input");
        Ok(found)
    }
}

/// Script focusing the first element matching `selector`; evaluates to
/// whether one was found.
pub fn focus_script(selector: &str) -> String {
    let literal = serde_json::Value::String(selector.to_string()).to_string();
    format!(
        "(() => {{ const el = document.querySelector({literal}); \
         if (!el) return false; el.focus(); return true; }})()"
    )
}

/// Group `pages` by window, windows in first-seen order and tabs in list
/// order. `window_ids[i]` belongs to `pages[i]`.
pub fn group_by_window(pages: &[PageInfo], window_ids: &[Option<i64>]) -> Vec<BrowserWindow> {
    let mut windows: Vec<BrowserWindow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, page) in pages.iter().enumerate() {
        let window_id = window_ids
            .get(i)
            .copied()
            .flatten()
            .map(|id| id.to_string())
            .unwrap_or_else(|| UNKNOWN_WINDOW.to_string());

        let slot = *index.entry(window_id.clone()).or_insert_with(|| {
            windows.push(BrowserWindow {
                id: window_id.clone(),
                tabs: Vec::new(),
            });
            windows.len() - 1
        });

        windows[slot].tabs.push(
            TabHandle::new(window_id, page.id.clone(), page.url.clone()).with_title(page.title.clone()),
        );
    }

    windows
}
