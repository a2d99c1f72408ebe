//! Error types raised by engine adapters.

mod browser;
mod input;

pub use browser::*;
pub use input::*;
