//! Reads `webask.toml` into a [`Config`].

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ConfigError;
use crate::schema::Config;

static ENV_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env reference pattern"));

pub struct ConfigLoader;

impl ConfigLoader {
    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Like [`ConfigLoader::load`], but a missing file yields the built-in
    /// defaults. Parse errors are still reported.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let substituted = Self::expand_env_vars(content)?;
        Ok(toml::from_str(&substituted)?)
    }

    /// Substitute every `${NAME}` with the value of that environment variable.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut unset = None;
        let substituted = ENV_REF.replace_all(content, |caps: &Captures<'_>| {
            match std::env::var(&caps[1]) {
                Ok(value) => value,
                Err(_) => {
                    unset.get_or_insert_with(|| caps[1].to_string());
                    String::new()
                }
            }
        });
        match unset {
            Some(name) => Err(ConfigError::EnvVarNotSet(name)),
            None => Ok(substituted.into_owned()),
        }
    }

    /// Expand a leading `~` to the home directory.
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.ask.max_attempts, 3);
        assert_eq!(config.poll.interval_ms, 2000);
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config =
            ConfigLoader::load_str(include_str!("../../../webask.example.toml")).unwrap();
        let defaults = crate::Config::default();
        assert_eq!(config.ask.url, defaults.ask.url);
        assert_eq!(config.ask.fields, defaults.ask.fields);
        assert_eq!(config.poll.stable_samples, defaults.poll.stable_samples);
        assert_eq!(config.browser.debug_port, defaults.browser.debug_port);
        assert!(!config.proxy.is_enabled());
        assert_eq!(config.logging.dir, defaults.logging.dir);
    }

    #[test]
    fn test_load_ask_section() {
        let content = r#"
            [ask]
            url = "perplexity.ai"
            max_attempts = 5
            return_all = true
            fields = ["answer"]
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.ask.url, "perplexity.ai");
        assert_eq!(config.ask.max_attempts, 5);
        assert!(config.ask.return_all);
        assert_eq!(config.ask.fields, vec!["answer"]);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [poll]
            interval_ms = 500
            stable_samples = 3

            [injector]
            paste_chord = "ctrl+shift+v"

            [detector]
            extra_challenge_patterns = ["are you a robot"]

            [browser]
            driver = "cdp"
            debug_port = 9333
            launch = true

            [proxy]
            server = "http://proxy.local:8080"
            bypass = ["localhost"]

            [proxy.options]
            zone = "unblocker"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.poll.stable_samples, 3);
        assert_eq!(config.injector.paste_chord, "ctrl+shift+v");
        assert_eq!(config.detector.extra_challenge_patterns.len(), 1);
        assert_eq!(config.browser.debug_port, 9333);
        assert!(config.browser.launch);
        assert!(config.proxy.is_enabled());
        assert_eq!(config.proxy.options["zone"], "unblocker");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[ask]").unwrap();
        writeln!(file, "attempt_timeout_seconds = 45").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.ask.attempt_timeout_seconds, 45);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/webask.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/webask.toml")).unwrap();
        assert_eq!(config.ask.max_attempts, 3);
    }

    #[test]
    fn test_load_or_default_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid = [unclosed").unwrap();
        assert!(ConfigLoader::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("WEBASK_TEST_PROXY_PASS", "s3cret");
        }
        let content = "[proxy]\npassword = \"${WEBASK_TEST_PROXY_PASS}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.proxy.password.as_deref(), Some("s3cret"));
        unsafe {
            std::env::remove_var("WEBASK_TEST_PROXY_PASS");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_WEBASK_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_expand_path_no_tilde() {
        let path = "/var/log/webask";
        assert_eq!(ConfigLoader::expand_path(path), path);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/logs");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/logs"));
    }
}
