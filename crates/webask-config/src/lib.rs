//! # webask Config
//!
//! Configuration management for the webask engine and CLI.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, Finding, ValidationResult};
