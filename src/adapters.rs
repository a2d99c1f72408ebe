//! Config-to-engine wiring for webask.

use std::path::PathBuf;
use std::time::Duration;

use webask_browser_cdp::{LaunchConfig, ProxyCredentials, ProxySettings};
use webask_config::{BrowserDriver, Config, ConfigLoader, DetectorConfig, InjectorConfig};
use webask_engine::{
    AskOptions, BlockDetector, DEFAULT_CHALLENGE_PATTERNS, DEFAULT_RATE_LIMIT_PATTERNS,
    ExtractOptions, InjectorSettings, PollConfig,
};
use webask_protocols::{ExtractionMode, Key, Prompt, UrlPattern};

use crate::cli::{AskArgs, DriverArg};

type SetupResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Fold command-line flags over the loaded configuration.
pub(crate) fn apply_overrides(config: &mut Config, args: &AskArgs) {
    let ask = &mut config.ask;
    if let Some(url) = &args.url {
        ask.url = url.clone();
    }
    if let Some(timeout) = args.timeout {
        ask.attempt_timeout_seconds = timeout;
    }
    if let Some(max) = args.max_attempts {
        ask.max_attempts = max;
    }
    if let Some(backoff) = args.backoff {
        ask.backoff_ms = backoff;
    }
    if let Some(fields) = &args.fields {
        ask.fields = fields
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
    }
    ask.return_all |= args.all;
    ask.allow_fallback |= args.allow_fallback;
    if args.no_json_format {
        ask.json_format = false;
    }
    if args.fatal_on_block {
        ask.retry_on_block = false;
    }
    if let Some(selector) = &args.selector {
        let selector = selector.trim();
        config.injector.input_selector = (!selector.is_empty()).then(|| selector.to_string());
    }

    if let Some(interval) = args.poll_interval {
        config.poll.interval_ms = interval;
    }
    if let Some(samples) = args.stable_samples {
        config.poll.stable_samples = samples;
    }

    if let Some(driver) = args.driver {
        config.browser.driver = match driver {
            DriverArg::Cdp => BrowserDriver::Cdp,
            DriverArg::Applescript => BrowserDriver::Applescript,
        };
    }
    config.browser.launch |= args.launch;
    if let Some(port) = args
        .cdp_endpoint
        .as_deref()
        .and_then(|e| url::Url::parse(e).ok())
        .and_then(|u| u.port())
    {
        config.browser.debug_port = port;
    }
}

/// The prompt actually submitted, with the JSON instruction when enabled.
pub(crate) fn build_prompt(text: &str, config: &Config) -> Prompt {
    if config.ask.json_format {
        Prompt::with_json_fields(text, &config.ask.fields)
    } else {
        Prompt::new(text)
    }
}

/// Engine options for one run.
pub(crate) fn ask_options(config: &Config) -> SetupResult<AskOptions> {
    let ask = &config.ask;
    let target = UrlPattern::parse(&ask.url)?;
    let mode = if ask.return_all {
        ExtractionMode::All
    } else {
        ExtractionMode::Last
    };
    let attempt_timeout = Duration::from_secs(ask.attempt_timeout_seconds);

    Ok(AskOptions {
        target,
        attempt_timeout,
        max_attempts: ask.max_attempts,
        backoff: Duration::from_millis(ask.backoff_ms),
        extraction: ExtractOptions::new(mode)
            .with_fields(ask.fields.clone())
            .with_fallback(ask.allow_fallback),
        retry_on_block: ask.retry_on_block,
        poll: PollConfig {
            interval: Duration::from_millis(config.poll.interval_ms),
            timeout: attempt_timeout,
            stable_samples: config.poll.stable_samples,
            max_consecutive_capture_errors: config.poll.max_consecutive_capture_errors,
        },
    })
}

/// Injection timing and key bindings.
pub(crate) fn injector_settings(config: &InjectorConfig) -> SetupResult<InjectorSettings> {
    Ok(InjectorSettings {
        clipboard_settle: Duration::from_millis(config.clipboard_settle_ms),
        focus_settle: Duration::from_millis(config.focus_settle_ms),
        submit_settle: Duration::from_millis(config.submit_settle_ms),
        paste_chord: Key::parse_chord(&config.paste_chord)?,
        submit_key: Key::parse(&config.submit_key)?,
        input_selector: config
            .input_selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    })
}

/// Block detector from built-in or replacement markers plus extras.
pub(crate) fn block_detector(config: &DetectorConfig) -> SetupResult<BlockDetector> {
    let markers = |replacement: &Option<Vec<String>>, defaults: &[&str], extra: &[String]| {
        let mut patterns = match replacement {
            Some(list) => list.clone(),
            None => defaults.iter().map(|p| p.to_string()).collect(),
        };
        patterns.extend(extra.iter().cloned());
        patterns
    };

    let challenge = markers(
        &config.challenge_patterns,
        DEFAULT_CHALLENGE_PATTERNS,
        &config.extra_challenge_patterns,
    );
    let rate_limit = markers(
        &config.rate_limit_patterns,
        DEFAULT_RATE_LIMIT_PATTERNS,
        &config.extra_rate_limit_patterns,
    );
    Ok(BlockDetector::new(&challenge, &rate_limit)?)
}

/// How to start Chrome, proxy egress included.
pub(crate) fn launch_config(config: &Config) -> LaunchConfig {
    let proxy = &config.proxy;
    let proxy = proxy.is_enabled().then(|| ProxySettings {
        server: proxy.server.clone().unwrap_or_default(),
        bypass: proxy.bypass.clone(),
        credentials: proxy_credentials(config),
    });

    let profile_dir = config.browser.profile_dir();
    LaunchConfig {
        chrome_path: config.browser.chrome_path.clone(),
        profile_dir: PathBuf::from(ConfigLoader::expand_path(&profile_dir.to_string_lossy())),
        debug_port: config.browser.debug_port,
        headless: config.browser.headless,
        proxy,
    }
}

/// Page opened in a freshly launched browser: the configured start page,
/// else the target pattern when it is itself an http(s) URL.
pub(crate) fn start_url(config: &Config) -> Option<String> {
    if let Some(url) = &config.browser.start_url {
        return Some(url.clone());
    }
    url::Url::parse(&config.ask.url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(String::from)
}

/// Proxy credentials, present only with a server and a username.
pub(crate) fn proxy_credentials(config: &Config) -> Option<ProxyCredentials> {
    let proxy = &config.proxy;
    if !proxy.is_enabled() {
        return None;
    }
    let username = proxy.effective_username()?;
    Some(ProxyCredentials::new(
        username,
        proxy.password.clone().unwrap_or_default(),
    ))
}
