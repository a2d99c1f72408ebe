//! # webask Desktop Input
//!
//! OS-level adapters for the webask engine.
//!
//! - [`ArboardClipboard`] - system clipboard
//! - [`EnigoKeyboard`] - keystrokes into the focused window
//! - [`AppleScriptTabSource`] and [`AppleScriptSnapshotProvider`] - Chrome
//!   control on macOS without a debugging port

pub mod applescript;
pub mod clipboard;
pub mod keyboard;

pub use applescript::{AppleScriptSnapshotProvider, AppleScriptTabSource};
pub use clipboard::ArboardClipboard;
pub use keyboard::EnigoKeyboard;
