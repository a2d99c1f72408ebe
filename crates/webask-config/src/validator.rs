//! Semantic checks that TOML parsing alone cannot express.

use crate::schema::{BrowserDriver, Config};

/// A problem with one key, addressed by its dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub path: String,
    pub message: String,
}

/// Errors block a run; warnings are only reported.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(Finding {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(Finding {
            path: path.to_string(),
            message: message.into(),
        });
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_ask(config, &mut result);
        Self::validate_poll(config, &mut result);
        Self::validate_injector(config, &mut result);
        Self::validate_detector(config, &mut result);
        Self::validate_browser(config, &mut result);
        Self::validate_proxy(config, &mut result);
        result
    }

    fn validate_ask(config: &Config, result: &mut ValidationResult) {
        let ask = &config.ask;

        if ask.url.trim().is_empty() {
            result.error("ask.url", "Target URL pattern cannot be empty");
        } else if let Some(expr) = ask.url.strip_prefix("re:") {
            if let Err(e) = regex::Regex::new(expr) {
                result.error("ask.url", format!("Invalid URL regex: {}", e));
            }
        }

        if ask.max_attempts == 0 {
            result.error("ask.max_attempts", "max_attempts must be greater than 0");
        }

        if ask.max_attempts > 20 {
            result.warn(
                "ask.max_attempts",
                "max_attempts is very high (>20); repeated submissions may trigger rate limiting",
            );
        }

        if ask.attempt_timeout_seconds == 0 {
            result.error(
                "ask.attempt_timeout_seconds",
                "attempt_timeout_seconds must be greater than 0",
            );
        }

        if ask.json_format && ask.fields.is_empty() {
            result.warn(
                "ask.fields",
                "json_format is enabled but no fields are requested; no instruction will be added",
            );
        }

        if ask.fields.iter().any(|f| f.trim().is_empty()) {
            result.error("ask.fields", "Field names cannot be empty");
        }
    }

    fn validate_poll(config: &Config, result: &mut ValidationResult) {
        let poll = &config.poll;

        if poll.interval_ms == 0 {
            result.error("poll.interval_ms", "interval_ms must be greater than 0");
        }

        if poll.stable_samples < 2 {
            result.error("poll.stable_samples", "stable_samples must be at least 2");
        }

        if poll.max_consecutive_capture_errors == 0 {
            result.error(
                "poll.max_consecutive_capture_errors",
                "max_consecutive_capture_errors must be greater than 0",
            );
        }

        let timeout_ms = config.ask.attempt_timeout_seconds.saturating_mul(1000);
        if timeout_ms > 0 && poll.interval_ms >= timeout_ms {
            result.warn(
                "poll.interval_ms",
                "Poll interval is not shorter than the attempt timeout; at most one sample will be taken",
            );
        }
    }

    fn validate_injector(config: &Config, result: &mut ValidationResult) {
        if config.injector.paste_chord.trim().is_empty() {
            result.error("injector.paste_chord", "paste_chord cannot be empty");
        }

        if config.injector.submit_key.trim().is_empty() {
            result.error("injector.submit_key", "submit_key cannot be empty");
        }

        if config
            .injector
            .input_selector
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            result.error("injector.input_selector", "input_selector cannot be blank; omit it instead");
        }
    }

    fn validate_detector(config: &Config, result: &mut ValidationResult) {
        let detector = &config.detector;

        if detector.challenge_patterns.as_ref().is_some_and(|p| p.is_empty())
            && detector.extra_challenge_patterns.is_empty()
        {
            result.warn(
                "detector.challenge_patterns",
                "Challenge detection is disabled (empty pattern list)",
            );
        }

        if detector.rate_limit_patterns.as_ref().is_some_and(|p| p.is_empty())
            && detector.extra_rate_limit_patterns.is_empty()
        {
            result.warn(
                "detector.rate_limit_patterns",
                "Rate-limit detection is disabled (empty pattern list)",
            );
        }
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        let browser = &config.browser;

        if browser.driver == BrowserDriver::Applescript && !cfg!(target_os = "macos") {
            result.error("browser.driver", "The applescript driver is only available on macOS");
        }

        if browser.debug_port == 0 {
            result.error("browser.debug_port", "Port cannot be 0");
        }

        if let Some(ref path) = browser.chrome_path {
            if !path.exists() {
                result.warn(
                    "browser.chrome_path",
                    format!("Chrome executable does not exist: {:?}", path),
                );
            }
        }
    }

    fn validate_proxy(config: &Config, result: &mut ValidationResult) {
        let proxy = &config.proxy;

        if !proxy.is_enabled() {
            if proxy.username.is_some() || proxy.password.is_some() {
                result.error(
                    "proxy.server",
                    "Proxy credentials are set but no proxy server is configured",
                );
            }
            return;
        }

        if let Some(ref server) = proxy.server {
            let valid_schemes = ["http://", "https://", "socks4://", "socks5://"];
            if !valid_schemes.iter().any(|s| server.starts_with(s)) {
                result.error(
                    "proxy.server",
                    format!("Proxy server must start with one of {:?}", valid_schemes),
                );
            }
        }

        if proxy.password.is_some() && proxy.username.is_none() {
            result.warn(
                "proxy.username",
                "Proxy password is set without a username and will be ignored",
            );
        }

        if !config.browser.launch {
            result.warn(
                "proxy",
                "Proxy settings only apply to a browser launched by webask (browser.launch = true)",
            );
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
