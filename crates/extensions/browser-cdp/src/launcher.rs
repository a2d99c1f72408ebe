//! Optional Chrome launch with a remote-debugging port and proxy egress.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use crate::auth::ProxyCredentials;
use crate::cdp::{CdpError, DevToolsEndpoint};

const STARTUP_POLL: Duration = Duration::from_millis(200);
const STARTUP_ATTEMPTS: u32 = 30;

/// Proxy egress for a launched browser.
#[derive(Debug, Clone, Default)]
pub struct ProxySettings {
    /// `scheme://host:port`, passed as `--proxy-server`.
    pub server: String,
    /// Hosts that bypass the proxy.
    pub bypass: Vec<String>,
    /// Answered through the Fetch domain once a tab is attached.
    pub credentials: Option<ProxyCredentials>,
}

/// How to start Chrome.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Explicit executable; searched in the usual install locations when unset.
    pub chrome_path: Option<PathBuf>,
    pub profile_dir: PathBuf,
    pub debug_port: u16,
    pub headless: bool,
    pub proxy: Option<ProxySettings>,
}

/// Whether the browser was already up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStatus {
    AlreadyRunning,
    Launched { pid: Option<u32> },
}

/// Starts Chrome when nothing answers on the debugging port.
pub struct ChromeLauncher {
    config: LaunchConfig,
}

impl ChromeLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// First existing Chrome or Chromium binary in the platform install locations.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];

        #[cfg(target_os = "linux")]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: &[&str] = &[];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Command-line arguments for the browser process.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.config.debug_port),
            format!("--user-data-dir={}", self.config.profile_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-sync".to_string(),
            "--disable-translate".to_string(),
        ];

        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        if let Some(proxy) = &self.config.proxy {
            args.push(format!("--proxy-server={}", proxy.server));
            if !proxy.bypass.is_empty() {
                args.push(format!("--proxy-bypass-list={}", proxy.bypass.join(";")));
            }
        }

        args
    }

    /// Make sure a browser answers on `endpoint`, launching one if needed.
    pub async fn ensure_running(&self, endpoint: &DevToolsEndpoint) -> Result<LaunchStatus, CdpError> {
        if endpoint.is_available().await {
            info!(port = self.config.debug_port, "Reusing the browser already on the debugging port");
            if self.config.proxy.is_some() {
                warn!("Chrome was already running; its proxy settings are left unchanged");
            }
            return Ok(LaunchStatus::AlreadyRunning);
        }

        let chrome_path = self
            .config
            .chrome_path
            .clone()
            .or_else(Self::find_chrome)
            .ok_or(CdpError::ChromeNotFound)?;

        if let Err(e) = std::fs::create_dir_all(&self.config.profile_dir) {
            warn!(dir = %self.config.profile_dir.display(), "Cannot create browser profile: {}", e);
        }

        info!(
            chrome = %chrome_path.display(),
            profile = %self.config.profile_dir.display(),
            proxied = self.config.proxy.is_some(),
            "Starting browser"
        );

        let child = Command::new(&chrome_path)
            .args(self.args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CdpError::LaunchFailed(format!("{}: {}", chrome_path.display(), e)))?;
        let pid = child.id();
        info!(?pid, "Browser process spawned; waiting for DevTools");

        for _ in 0..STARTUP_ATTEMPTS {
            tokio::time::sleep(STARTUP_POLL).await;
            if endpoint.is_available().await {
                return Ok(LaunchStatus::Launched { pid });
            }
        }

        Err(CdpError::LaunchFailed(format!(
            "{} never answered after {} checks",
            endpoint.base(),
            STARTUP_ATTEMPTS
        )))
    }
}
