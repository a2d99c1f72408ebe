//! System clipboard through arboard.

use tracing::trace;
use webask_protocols::{Clipboard, ClipboardError};

/// [`Clipboard`] backed by the OS clipboard.
///
/// On Linux the clipboard owner must outlive the paste, so one native handle
/// is held for the adapter's lifetime. Elsewhere a handle is opened per call.
#[derive(Default)]
pub struct ArboardClipboard {
    #[cfg(target_os = "linux")]
    owner: Option<arboard::Clipboard>,
}

impl ArboardClipboard {
    /// Create the adapter and check that the clipboard can be opened.
    pub fn new() -> Result<Self, ClipboardError> {
        let mut clipboard = Self::default();
        clipboard.with_native(|_| Ok(()))?;
        Ok(clipboard)
    }

    #[cfg(target_os = "linux")]
    fn with_native<T>(
        &mut self,
        f: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>,
    ) -> Result<T, ClipboardError> {
        if self.owner.is_none() {
            self.owner = Some(arboard::Clipboard::new().map_err(map_error)?);
        }
        match self.owner.as_mut() {
            Some(native) => f(native).map_err(map_error),
            None => Err(ClipboardError::AccessFailed("clipboard unavailable".to_string())),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn with_native<T>(
        &mut self,
        f: impl FnOnce(&mut arboard::Clipboard) -> Result<T, arboard::Error>,
    ) -> Result<T, ClipboardError> {
        let mut native = arboard::Clipboard::new().map_err(map_error)?;
        f(&mut native).map_err(map_error)
    }
}

impl Clipboard for ArboardClipboard {
    fn get_text(&mut self) -> Result<Option<String>, ClipboardError> {
        match self.with_native(|c| c.get_text()) {
            Ok(text) => Ok(Some(text)),
            // Empty, or holding something other than text.
            Err(ClipboardError::NotText) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        trace!(chars = text.chars().count(), "Setting clipboard text");
        self.with_native(|c| c.set_text(text))
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        self.with_native(|c| c.clear())
    }
}

fn map_error(e: arboard::Error) -> ClipboardError {
    match e {
        arboard::Error::ContentNotAvailable | arboard::Error::ConversionFailure => {
            ClipboardError::NotText
        }
        other => ClipboardError::AccessFailed(other.to_string()),
    }
}
