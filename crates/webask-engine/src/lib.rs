//! # webask Engine
//!
//! The ask-and-extract engine. One run focuses a browser tab, pastes a
//! prompt into it, polls the rendered page until the assistant's reply
//! settles, classifies each sample for anti-automation blocks and finally
//! recovers JSON objects from the reply text.
//!
//! ## Components
//!
//! - [`TargetLocator`]: finds and focuses the tab whose URL matches a pattern
//! - [`InputInjector`]: pastes a prompt through the clipboard and submits it
//! - [`BlockDetector`]: classifies snapshots as clear, challenged or rate limited
//! - [`ResponsePoller`]: samples the page until completion, block or timeout
//! - [`Extractor`]: recovers JSON objects from free-form reply text
//! - [`AskOrchestrator`]: the attempt state machine tying the above together
//!
//! ## Control flow
//!
//! ```text
//! Idle ─▶ Locating ─▶ Injecting ─▶ Polling ⇄ Classifying ─▶ Extracting ─▶ Succeeded
//!            │            │                      │               │
//!            └────────────┴──────▶ Retrying ◀────┴───────────────┘
//!                                     │
//!                                     └─▶ Failed (attempt budget spent)
//! ```
//!
//! All platform access goes through the traits in `webask-protocols`, so
//! every component runs against in-memory fakes in tests.

pub mod detector;
pub mod error;
pub mod extractor;
pub mod injector;
pub mod locator;
pub mod orchestrator;
pub mod poller;

#[cfg(test)]
pub(crate) mod fakes;

pub use detector::{BlockDetector, DEFAULT_CHALLENGE_PATTERNS, DEFAULT_RATE_LIMIT_PATTERNS};
pub use error::{DetectorError, InjectError, LocateError, PollError};
pub use extractor::{ExtractOptions, Extractor};
pub use injector::{ClipboardGuard, DesktopHandle, InjectorSettings, InputInjector};
pub use locator::TargetLocator;
pub use orchestrator::{AskOptions, AskOrchestrator, OrchestratorState};
pub use poller::{PollConfig, PollReport, PollTermination, ResponsePoller};

// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;
