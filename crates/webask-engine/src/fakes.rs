//! In-memory adapters for engine tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use webask_protocols::{
    BrowserWindow, CaptureError, Clipboard, ClipboardError, InputError, Key, Keyboard, PageLayout,
    Session, Snapshot, SnapshotProvider, TabHandle, TabSource, TabSourceError,
};

/// Clipboard backed by a plain `Option<String>`.
#[derive(Debug, Default)]
pub struct FakeClipboard {
    pub content: Option<String>,
    pub writes: Vec<String>,
    pub clears: u32,
    pub fail_get: bool,
    pub not_text: bool,
}

impl FakeClipboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            content: Some(text.to_string()),
            ..Default::default()
        }
    }
}

impl Clipboard for FakeClipboard {
    fn get_text(&mut self) -> Result<Option<String>, ClipboardError> {
        if self.fail_get {
            return Err(ClipboardError::AccessFailed("locked".to_string()));
        }
        if self.not_text {
            return Err(ClipboardError::NotText);
        }
        Ok(self.content.clone())
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.not_text = false;
        self.content = Some(text.to_string());
        self.writes.push(text.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        self.not_text = false;
        self.content = None;
        self.clears += 1;
        Ok(())
    }
}

/// Keystroke event seen by [`FakeKeyboard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Press(Key),
    Chord(Vec<Key>),
}

/// Keyboard that records what it was asked to type.
#[derive(Debug, Default)]
pub struct FakeKeyboard {
    pub events: Vec<KeyEvent>,
    pub fail_press: bool,
}

impl FakeKeyboard {
    pub fn submits(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, KeyEvent::Press(Key::Enter)))
            .count()
    }
}

impl Keyboard for FakeKeyboard {
    fn press(&mut self, key: Key) -> Result<(), InputError> {
        if self.fail_press {
            return Err(InputError::Failed("event source unavailable".to_string()));
        }
        self.events.push(KeyEvent::Press(key));
        Ok(())
    }

    fn chord(&mut self, keys: &[Key]) -> Result<(), InputError> {
        self.events.push(KeyEvent::Chord(keys.to_vec()));
        Ok(())
    }
}

/// Tab source over a fixed window list.
#[derive(Debug, Default)]
pub struct StaticTabSource {
    pub windows: Vec<BrowserWindow>,
    pub activations: Mutex<Vec<String>>,
    pub list_count: AtomicU32,
    pub fail_activate: bool,
    /// Selectors that match an element on every tab.
    pub inputs: Vec<String>,
    pub focus_calls: Mutex<Vec<(String, String)>>,
}

impl StaticTabSource {
    pub fn new(windows: Vec<BrowserWindow>) -> Self {
        Self {
            windows,
            ..Default::default()
        }
    }

    /// One window holding tabs with the given URLs.
    pub fn single_window(urls: &[&str]) -> Self {
        let tabs = urls
            .iter()
            .enumerate()
            .map(|(i, url)| TabHandle::new("w1", format!("t{}", i + 1), *url))
            .collect();
        Self::new(vec![BrowserWindow {
            id: "w1".to_string(),
            tabs,
        }])
    }

    pub fn activated(&self) -> Vec<String> {
        self.activations.lock().clone()
    }

    pub fn list_calls(&self) -> u32 {
        self.list_count.load(Ordering::SeqCst)
    }

    /// `(tab id, selector)` of every focus request.
    pub fn focused_inputs(&self) -> Vec<(String, String)> {
        self.focus_calls.lock().clone()
    }
}

#[async_trait]
impl TabSource for StaticTabSource {
    async fn list_windows(&self) -> Result<Vec<BrowserWindow>, TabSourceError> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.windows.clone())
    }

    async fn activate(&self, tab: &TabHandle) -> Result<(), TabSourceError> {
        if self.fail_activate {
            return Err(TabSourceError::ActivateFailed {
                tab_id: tab.tab_id.clone(),
                message: "tab closed".to_string(),
            });
        }
        self.activations.lock().push(tab.tab_id.clone());
        Ok(())
    }

    async fn focus_input(&self, tab: &TabHandle, selector: &str) -> Result<bool, TabSourceError> {
        self.focus_calls
            .lock()
            .push((tab.tab_id.clone(), selector.to_string()));
        Ok(self.inputs.iter().any(|s| s == selector))
    }
}

/// Snapshot provider replaying a script of page states.
///
/// Once the script runs out the last entry repeats.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Snapshot, CaptureError>>>,
    last: Mutex<Option<Result<Snapshot, CaptureError>>>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Snapshot, CaptureError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    /// Script of successful captures with the given response texts.
    pub fn responses(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(response(t))).collect())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotProvider for ScriptedProvider {
    async fn capture(&self, _session: &Session) -> Result<Snapshot, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(entry) => {
                *self.last.lock() = Some(entry.clone());
                entry
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(Snapshot::new("https://chat.example/", "", ""))),
        }
    }
}

/// Snapshot whose response region holds `text`; an empty text yields a
/// page with no response region.
pub fn response(text: &str) -> Snapshot {
    let page = format!("Chat\n{}", text);
    let snapshot = Snapshot::new("https://chat.example/c/1", page.clone(), format!("<main>{}</main>", page));
    if text.is_empty() {
        snapshot
    } else {
        snapshot.with_response(PageLayout::Generic, text)
    }
}

/// A focused session on a fake tab.
pub fn focused_session() -> Session {
    let mut session = Session::new(
        webask_protocols::UrlPattern::Substring("chat.example".to_string()),
        TabHandle::new("w1", "t1", "https://chat.example/c/1"),
    );
    session.focused = true;
    session
}
