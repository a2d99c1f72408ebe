//! Clipboard and keyboard errors.

use thiserror::Error;

/// Clipboard errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("Clipboard access failed: {0}")]
    AccessFailed(String),

    #[error("Clipboard holds non-text content")]
    NotText,
}

/// Keystroke injection errors.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input failed: {0}")]
    Failed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}
