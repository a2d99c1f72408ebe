//! Shared browser connection.
//!
//! The tab source and the snapshot provider talk to the same browser. The
//! WebSocket client is opened on first use and page sessions are cached
//! per tab so that repeated captures reuse one attachment.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::auth::{self, ProxyCredentials};
use crate::cdp::{CdpClient, CdpError, DevToolsEndpoint, PageSession};

/// Lazily connected handle on one browser's debugging port.
pub struct CdpConnection {
    endpoint: DevToolsEndpoint,
    client: OnceCell<Arc<CdpClient>>,
    sessions: Mutex<HashMap<String, Arc<PageSession>>>,
    proxy_credentials: Option<ProxyCredentials>,
}

impl CdpConnection {
    pub fn new(endpoint: DevToolsEndpoint) -> Self {
        Self {
            endpoint,
            client: OnceCell::new(),
            sessions: Mutex::new(HashMap::new()),
            proxy_credentials: None,
        }
    }

    /// Answer proxy authentication challenges on every attached tab.
    pub fn with_proxy_credentials(mut self, credentials: ProxyCredentials) -> Self {
        self.proxy_credentials = Some(credentials);
        self
    }

    pub fn endpoint(&self) -> &DevToolsEndpoint {
        &self.endpoint
    }

    /// The browser-level client, connecting on first call.
    ///
    /// A failed connect is not cached; the next call tries again.
    pub async fn client(&self) -> Result<Arc<CdpClient>, CdpError> {
        self.client
            .get_or_try_init(|| async {
                let client = CdpClient::connect(&self.endpoint).await?;
                info!("Connected to Chrome at {}", self.endpoint.base());
                Ok::<_, CdpError>(Arc::new(client))
            })
            .await
            .cloned()
    }

    /// Session on `target_id`, attaching if none is cached.
    pub async fn session(&self, target_id: &str) -> Result<Arc<PageSession>, CdpError> {
        if let Some(session) = self.sessions.lock().get(target_id) {
            return Ok(session.clone());
        }

        let client = self.client().await?;
        let session = Arc::new(client.attach(target_id).await?);
        if let Some(credentials) = &self.proxy_credentials {
            auth::install(session.clone(), credentials.clone()).await?;
        }

        // Another capture may have attached meanwhile; keep the first.
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(target_id.to_string())
            .or_insert(session)
            .clone();
        Ok(session)
    }

    /// Drop the cached session on `target_id`, e.g. after its tab closed.
    pub async fn forget(&self, target_id: &str) {
        let removed = self.sessions.lock().remove(target_id);
        if let Some(session) = removed {
            debug!(target_id, "Dropping cached page session");
            if let Some(client) = self.client.get() {
                client.detach(&session).await;
            }
        }
    }

    /// Open a new tab on `url` with proxy authentication in place before the
    /// first request goes out.
    pub async fn open_tab(&self, url: &str) -> Result<String, CdpError> {
        let client = self.client().await?;
        let target_id = client.create_target("about:blank").await?;
        let session = self.session(&target_id).await?;
        session.navigate(url).await?;
        info!(target_id = %target_id, url, "Opened start page");
        Ok(target_id)
    }
}
