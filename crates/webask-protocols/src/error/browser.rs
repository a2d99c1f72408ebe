//! Browser adapter errors.

use thiserror::Error;

/// Errors from enumerating or activating browser tabs.
#[derive(Debug, Error)]
pub enum TabSourceError {
    #[error("Browser not reachable: {0}")]
    Unavailable(String),

    #[error("Failed to list tabs: {0}")]
    ListFailed(String),

    #[error("Failed to activate tab {tab_id}: {message}")]
    ActivateFailed { tab_id: String, message: String },

    #[error("Failed to focus input in tab {tab_id}: {message}")]
    FocusFailed { tab_id: String, message: String },

    #[error("Tab source not supported on this platform")]
    PlatformNotSupported,
}

/// Errors from capturing a page snapshot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Failed to attach to tab {0}")]
    AttachFailed(String),

    #[error("Page script failed: {0}")]
    Script(String),

    #[error("Page closed: {0}")]
    PageClosed(String),

    #[error("Invalid capture payload: {0}")]
    InvalidPayload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_failed_display() {
        let err = TabSourceError::ActivateFailed {
            tab_id: "ABC".to_string(),
            message: "gone".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("ABC"));
        assert!(display.contains("gone"));
    }

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::Script("ReferenceError".to_string());
        assert!(err.to_string().contains("ReferenceError"));
        assert!(CaptureError::PageClosed("t1".into()).to_string().contains("closed"));
    }
}
