//! Chrome DevTools Protocol (CDP) client.
//!
//! Talks to an already running Chrome/Chromium over its remote-debugging
//! port: the HTTP side lists and activates tabs, the WebSocket side attaches
//! to a tab and evaluates script in it.
//!
//! ```bash
//! chrome --remote-debugging-port=9222
//! ```

mod client;
mod discovery;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use discovery::DevToolsEndpoint;
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
