//! Data model shared by the engine and its adapters.

mod attempt;
mod extraction;
mod prompt;
mod session;
mod snapshot;

pub use attempt::*;
pub use extraction::*;
pub use prompt::*;
pub use session::*;
pub use snapshot::*;
