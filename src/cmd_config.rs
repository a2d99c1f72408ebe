//! The `check-config` subcommand.

use std::path::Path;

use webask_config::{ConfigLoader, ConfigValidator};

/// Load and validate the configuration, printing every finding.
/// Returns the process exit code.
pub(crate) fn check_config(path: &Path) -> Result<i32, Box<dyn std::error::Error>> {
    if !path.exists() {
        println!("{} not found; built-in defaults apply", path.display());
    }
    let config = ConfigLoader::load_or_default(path)?;
    let result = ConfigValidator::validate(&config);

    for error in &result.errors {
        println!("error   {}: {}", error.path, error.message);
    }
    for warning in &result.warnings {
        println!("warning {}: {}", warning.path, warning.message);
    }

    if result.is_valid() {
        println!(
            "Configuration OK ({} warning{})",
            result.warnings.len(),
            if result.warnings.len() == 1 { "" } else { "s" }
        );
        Ok(0)
    } else {
        println!("Configuration has {} error(s)", result.errors.len());
        Ok(1)
    }
}
