//! Engine error types.
//!
//! These never escape [`crate::AskOrchestrator::run`]; the orchestrator
//! folds each of them into the outcome of the attempt that raised it.

use thiserror::Error;
use webask_protocols::{CaptureError, ClipboardError, InputError, TabSourceError};

/// Errors from the target locator.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("No open tab matches '{0}'")]
    TargetNotFound(String),

    #[error("No element matches input selector '{0}'")]
    InputNotFound(String),

    #[error("Tab source error: {0}")]
    Source(#[from] TabSourceError),
}

/// Errors from the input injector.
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("No focused target for input injection")]
    NoActiveTarget,

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Injection cancelled")]
    Cancelled,
}

/// Errors from the response poller.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Capture failed {failures} times in a row: {source}")]
    Capture {
        failures: u32,
        #[source]
        source: CaptureError,
    },
}

/// Errors building a block detector.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Invalid marker patterns: {0}")]
    InvalidPatterns(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_error_display() {
        let err = LocateError::TargetNotFound("chat.qwen.ai".to_string());
        assert_eq!(err.to_string(), "No open tab matches 'chat.qwen.ai'");
    }

    #[test]
    fn test_locate_error_from_source() {
        let err: LocateError = TabSourceError::Unavailable("port closed".to_string()).into();
        assert!(matches!(err, LocateError::Source(_)));
        assert!(err.to_string().contains("port closed"));
    }

    #[test]
    fn test_inject_error_from_clipboard() {
        let err: InjectError = ClipboardError::AccessFailed("locked".to_string()).into();
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn test_poll_error_display() {
        let err = PollError::Capture {
            failures: 3,
            source: CaptureError::PageClosed("tab gone".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 times"));
        assert!(msg.contains("tab gone"));
    }
}
