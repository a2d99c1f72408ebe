//! Failures talking to Chrome, and how they map onto adapter errors.

use thiserror::Error;
use webask_protocols::{CaptureError, TabSourceError};

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("cannot reach browser: {0}")]
    ConnectionFailed(String),

    /// Nothing answers on the debugging port.
    #[error(
        "no DevTools endpoint at {0}; start Chrome with --remote-debugging-port or pass --launch"
    )]
    ChromeNotAvailable(String),

    #[error("no Chrome executable found; set browser.chrome_path")]
    ChromeNotFound,

    /// The process started but its endpoint never came up.
    #[error("Chrome did not start: {0}")]
    LaunchFailed(String),

    #[error("browser socket: {0}")]
    WebSocket(String),

    /// Error reply to a command.
    #[error("{message} ({code})")]
    Protocol { code: i64, message: String },

    #[error("malformed DevTools message: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Discovery endpoints (`/json/*`).
    #[error("discovery request failed: {0}")]
    Http(String),

    #[error("page script threw: {0}")]
    JavaScript(String),

    #[error("timed out: {0}")]
    Timeout(String),

    /// The socket went away with the command in flight.
    #[error("browser socket closed")]
    SessionClosed,

    #[error("unexpected reply: {0}")]
    InvalidResponse(String),
}

impl CdpError {
    /// Whether the target behind a session is gone.
    pub fn is_target_gone(&self) -> bool {
        match self {
            CdpError::SessionClosed => true,
            CdpError::Protocol { message, .. } => {
                let message = message.to_ascii_lowercase();
                message.contains("no session") || message.contains("no target")
            }
            _ => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("bad endpoint URL: {}", e))
    }
}

impl From<CdpError> for TabSourceError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ConnectionFailed(msg) | CdpError::ChromeNotAvailable(msg) => {
                TabSourceError::Unavailable(msg)
            }
            CdpError::Http(msg) => TabSourceError::Unavailable(msg),
            other => TabSourceError::ListFailed(other.to_string()),
        }
    }
}

impl From<CdpError> for CaptureError {
    fn from(e: CdpError) -> Self {
        if e.is_target_gone() {
            return CaptureError::PageClosed(e.to_string());
        }
        match e {
            CdpError::JavaScript(msg) => CaptureError::Script(msg),
            CdpError::Serialization(err) => CaptureError::InvalidPayload(err.to_string()),
            CdpError::InvalidResponse(msg) => CaptureError::InvalidPayload(msg),
            other => CaptureError::Script(other.to_string()),
        }
    }
}
