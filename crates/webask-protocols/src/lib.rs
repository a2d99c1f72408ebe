//! # webask Protocols
//!
//! Data model and adapter seams for the webask engine.
//! Contains only types and interface definitions - no platform code.
//!
//! ## Core Traits
//!
//! - [`TabSource`] - Enumerates browser windows/tabs and activates one
//! - [`SnapshotProvider`] - Captures a read-only [`Snapshot`] of the active page
//! - [`Clipboard`] - System clipboard access
//! - [`Keyboard`] - Keystroke injection

pub mod browser;
pub mod error;
pub mod input;
pub mod types;

pub use browser::{SnapshotProvider, TabSource};
pub use error::{CaptureError, ClipboardError, InputError, TabSourceError};
pub use input::{Clipboard, Key, Keyboard, Modifier};
pub use types::*;
