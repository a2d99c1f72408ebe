//! Clipboard-based prompt injection.
//!
//! The clipboard and the keyboard focus are process-wide resources. They
//! are owned by a single [`DesktopHandle`] that the orchestrator borrows
//! mutably for one attempt at a time, so two injections can never overlap.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use webask_protocols::{Clipboard, ClipboardError, Key, Keyboard, Modifier, Prompt, Session};

use crate::error::InjectError;

/// Exclusive owner of the clipboard and keyboard.
pub struct DesktopHandle<C: Clipboard, K: Keyboard> {
    clipboard: C,
    keyboard: K,
}

impl<C: Clipboard, K: Keyboard> DesktopHandle<C, K> {
    pub fn new(clipboard: C, keyboard: K) -> Self {
        Self {
            clipboard,
            keyboard,
        }
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }

    pub fn into_parts(self) -> (C, K) {
        (self.clipboard, self.keyboard)
    }
}

/// Scoped clipboard acquisition.
///
/// Saves the clipboard text on acquire and puts it back on drop, on every
/// exit path. An empty (or non-text) clipboard is restored by clearing it.
pub struct ClipboardGuard<'a, C: Clipboard> {
    clipboard: &'a mut C,
    saved: Option<String>,
}

impl<'a, C: Clipboard> ClipboardGuard<'a, C> {
    pub fn acquire(clipboard: &'a mut C) -> Result<Self, ClipboardError> {
        let saved = match clipboard.get_text() {
            Ok(text) => text,
            Err(ClipboardError::NotText) => {
                warn!("Clipboard holds non-text content; it will be cleared afterwards");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self { clipboard, saved })
    }

    pub fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.clipboard.set_text(text)
    }

    /// The content that will be restored.
    pub fn saved(&self) -> Option<&str> {
        self.saved.as_deref()
    }
}

impl<C: Clipboard> Drop for ClipboardGuard<'_, C> {
    fn drop(&mut self) {
        let restored = match self.saved.take() {
            Some(text) => self.clipboard.set_text(&text),
            None => self.clipboard.clear(),
        };
        if let Err(e) = restored {
            warn!("Failed to restore clipboard: {}", e);
        }
    }
}

/// Injection timing and key bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectorSettings {
    /// Wait after setting the clipboard.
    pub clipboard_settle: Duration,
    /// Wait after focusing before the first keystroke.
    pub focus_settle: Duration,
    /// Wait between paste and submit.
    pub submit_settle: Duration,
    pub paste_chord: Vec<Key>,
    pub submit_key: Key,
    /// CSS selector of the chat input, focused in the page before pasting.
    pub input_selector: Option<String>,
}

impl Default for InjectorSettings {
    fn default() -> Self {
        let modifier = if cfg!(target_os = "macos") {
            Modifier::Meta
        } else {
            Modifier::Control
        };
        Self {
            clipboard_settle: Duration::from_millis(200),
            focus_settle: Duration::from_millis(500),
            submit_settle: Duration::from_millis(300),
            paste_chord: vec![Key::Modifier(modifier), Key::Char('v')],
            submit_key: Key::Enter,
            input_selector: None,
        }
    }
}

/// Pastes a prompt into the focused tab and submits it.
#[derive(Debug, Clone, Default)]
pub struct InputInjector {
    settings: InjectorSettings,
}

impl InputInjector {
    pub fn new(settings: InjectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &InjectorSettings {
        &self.settings
    }

    /// Paste `prompt` into the session's tab and press submit.
    ///
    /// The previous clipboard content is restored before returning,
    /// whatever the result.
    pub async fn inject<C: Clipboard, K: Keyboard>(
        &self,
        desktop: &mut DesktopHandle<C, K>,
        session: &Session,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<(), InjectError> {
        if !session.focused {
            return Err(InjectError::NoActiveTarget);
        }

        settle(self.settings.focus_settle, cancel).await?;

        let text = prompt.rendered();
        let DesktopHandle {
            clipboard,
            keyboard,
        } = desktop;

        let mut guard = ClipboardGuard::acquire(clipboard)?;
        guard.set_text(&text)?;
        debug!(chars = text.chars().count(), "Prompt placed on clipboard");

        settle(self.settings.clipboard_settle, cancel).await?;
        keyboard.chord(&self.settings.paste_chord)?;

        settle(self.settings.submit_settle, cancel).await?;
        keyboard.press(self.settings.submit_key)?;

        drop(guard);
        debug!(tab = %session.handle.tab_id, "Prompt submitted");
        Ok(())
    }
}

/// Sleep for a settle delay unless cancelled first.
async fn settle(duration: Duration, cancel: &CancellationToken) -> Result<(), InjectError> {
    if cancel.is_cancelled() {
        return Err(InjectError::Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(InjectError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
#[path = "injector_tests.rs"]
mod tests;
