//! DevTools HTTP endpoint: version check, target list, tab activation.

use std::time::Duration;

use tracing::debug;
use url::Url;

use super::error::CdpError;
use super::protocol::{BrowserVersion, PageInfo};

/// HTTP side of a Chrome remote-debugging port.
#[derive(Debug, Clone)]
pub struct DevToolsEndpoint {
    base: String,
    http: reqwest::Client,
}

impl DevToolsEndpoint {
    /// Endpoint at `base`, e.g. `http://localhost:9222`.
    pub fn new(base: &str) -> Result<Self, CdpError> {
        let url = Url::parse(base)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CdpError::ConnectionFailed(format!(
                "Unsupported endpoint scheme: {}",
                url.scheme()
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Fetch `/json/version`.
    pub async fn version(&self) -> Result<BrowserVersion, CdpError> {
        let url = format!("{}/json/version", self.base);
        debug!("Fetching browser version from {}", url);
        self.http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", self.base, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", self.base, e)))
    }

    /// Whether a browser answers on this endpoint.
    pub async fn is_available(&self) -> bool {
        self.version().await.is_ok()
    }

    /// All targets from `/json/list`, in the order Chrome reports them.
    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        let url = format!("{}/json/list", self.base);
        let pages = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<PageInfo>>()
            .await?;
        Ok(pages)
    }

    /// Bring a target's window to the front with the target selected.
    pub async fn activate(&self, target_id: &str) -> Result<(), CdpError> {
        let url = format!("{}/json/activate/{}", self.base, target_id);
        let response = self.http.get(&url).send().await?;
        if response.status().is_success() {
            debug!(target_id, "Activated target");
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(CdpError::Http(format!(
            "activate {} returned {}: {}",
            target_id,
            status,
            body.trim()
        )))
    }
}
