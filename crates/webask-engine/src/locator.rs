//! Target tab location.

use std::sync::Arc;

use tracing::{debug, info};

use webask_protocols::{Session, TabSource, UrlPattern};

use crate::error::LocateError;

/// Finds the first tab whose URL matches a pattern and focuses it.
pub struct TargetLocator {
    source: Arc<dyn TabSource>,
}

impl TargetLocator {
    pub fn new(source: Arc<dyn TabSource>) -> Self {
        Self { source }
    }

    /// Scan windows front-to-back and tabs in native order; the first match
    /// is activated and returned as a focused session.
    ///
    /// Non-matching tabs are never touched.
    pub async fn locate(&self, pattern: &UrlPattern) -> Result<Session, LocateError> {
        let windows = self.source.list_windows().await?;
        let tab_count: usize = windows.iter().map(|w| w.tabs.len()).sum();
        debug!(
            windows = windows.len(),
            tabs = tab_count,
            pattern = %pattern,
            "Scanning browser tabs"
        );

        let handle = windows
            .into_iter()
            .flat_map(|w| w.tabs)
            .find(|tab| pattern.matches(&tab.url))
            .ok_or_else(|| LocateError::TargetNotFound(pattern.to_string()))?;

        self.source.activate(&handle).await?;
        info!(
            window = %handle.window_id,
            tab = %handle.tab_id,
            url = %handle.url,
            "Target tab focused"
        );

        let mut session = Session::new(pattern.clone(), handle);
        session.focused = true;
        Ok(session)
    }

    /// Re-activate a previously located tab without rescanning.
    ///
    /// On failure the session is marked unfocused.
    pub async fn refocus(&self, session: &mut Session) -> Result<(), LocateError> {
        match self.source.activate(&session.handle).await {
            Ok(()) => {
                session.focused = true;
                debug!(tab = %session.handle.tab_id, "Target tab refocused");
                Ok(())
            }
            Err(e) => {
                session.focused = false;
                Err(e.into())
            }
        }
    }

    /// Focus the chat input matching `selector` inside the session's page.
    pub async fn focus_input(&self, session: &Session, selector: &str) -> Result<(), LocateError> {
        if self.source.focus_input(&session.handle, selector).await? {
            debug!(tab = %session.handle.tab_id, selector, "Chat input focused");
            Ok(())
        } else {
            Err(LocateError::InputNotFound(selector.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::StaticTabSource;
    use webask_protocols::{BrowserWindow, TabHandle};

    fn windows() -> Vec<BrowserWindow> {
        vec![
            BrowserWindow {
                id: "front".to_string(),
                tabs: vec![
                    TabHandle::new("front", "a", "https://news.example/"),
                    TabHandle::new("front", "b", "https://chat.qwen.ai/c/42"),
                ],
            },
            BrowserWindow {
                id: "back".to_string(),
                tabs: vec![
                    TabHandle::new("back", "c", "https://chat.qwen.ai/"),
                    TabHandle::new("back", "d", "https://www.perplexity.ai/"),
                ],
            },
        ]
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let source = Arc::new(StaticTabSource::new(windows()));
        let locator = TargetLocator::new(source.clone());

        let session = locator
            .locate(&UrlPattern::parse("chat.qwen.ai").unwrap())
            .await
            .unwrap();

        assert_eq!(session.handle.tab_id, "b");
        assert!(session.focused);
        assert_eq!(source.activated(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_scans_later_windows() {
        let source = Arc::new(StaticTabSource::new(windows()));
        let locator = TargetLocator::new(source.clone());

        let session = locator
            .locate(&UrlPattern::parse("perplexity").unwrap())
            .await
            .unwrap();

        assert_eq!(session.handle.window_id, "back");
        assert_eq!(session.handle.tab_id, "d");
    }

    #[tokio::test]
    async fn test_regex_pattern() {
        let source = Arc::new(StaticTabSource::new(windows()));
        let locator = TargetLocator::new(source);

        let session = locator
            .locate(&UrlPattern::parse(r"re:^https://chat\.qwen\.ai/$").unwrap())
            .await
            .unwrap();

        assert_eq!(session.handle.tab_id, "c");
    }

    #[tokio::test]
    async fn test_not_found_touches_nothing() {
        let source = Arc::new(StaticTabSource::new(windows()));
        let locator = TargetLocator::new(source.clone());

        let err = locator
            .locate(&UrlPattern::parse("claude.ai").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, LocateError::TargetNotFound(ref p) if p == "claude.ai"));
        assert!(source.activated().is_empty());
    }

    #[tokio::test]
    async fn test_no_windows() {
        let locator = TargetLocator::new(Arc::new(StaticTabSource::default()));
        let err = locator
            .locate(&UrlPattern::parse("qwen").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LocateError::TargetNotFound(_)));
    }

    #[tokio::test]
    async fn test_refocus_does_not_rescan() {
        let source = Arc::new(StaticTabSource::new(windows()));
        let locator = TargetLocator::new(source.clone());
        let mut session = locator
            .locate(&UrlPattern::parse("qwen").unwrap())
            .await
            .unwrap();
        session.focused = false;

        locator.refocus(&mut session).await.unwrap();

        assert!(session.focused);
        assert_eq!(source.list_calls(), 1);
        assert_eq!(source.activated(), vec!["b", "b"]);
    }

    #[tokio::test]
    async fn test_refocus_failure_unfocuses() {
        let source = Arc::new(StaticTabSource {
            fail_activate: true,
            ..StaticTabSource::new(windows())
        });
        let locator = TargetLocator::new(source);
        let mut session = Session::new(
            UrlPattern::parse("qwen").unwrap(),
            TabHandle::new("front", "b", "https://chat.qwen.ai/c/42"),
        );
        session.focused = true;

        let err = locator.refocus(&mut session).await.unwrap_err();
        assert!(matches!(err, LocateError::Source(_)));
        assert!(!session.focused);
    }

    #[tokio::test]
    async fn test_focus_input_by_selector() {
        let source = Arc::new(StaticTabSource {
            inputs: vec!["textarea#chat-input".to_string()],
            ..StaticTabSource::new(windows())
        });
        let locator = TargetLocator::new(source.clone());
        let session = locator
            .locate(&UrlPattern::parse("qwen").unwrap())
            .await
            .unwrap();

        locator
            .focus_input(&session, "textarea#chat-input")
            .await
            .unwrap();
        assert_eq!(source.focused_inputs(), vec![("b".to_string(), "textarea#chat-input".to_string())]);

        let err = locator.focus_input(&session, "#missing").await.unwrap_err();
        assert!(matches!(err, LocateError::InputNotFound(ref s) if s == "#missing"));
    }
}
