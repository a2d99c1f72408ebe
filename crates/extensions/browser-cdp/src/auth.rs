//! Proxy authentication through the Fetch domain.
//!
//! Chrome takes the proxy server on its command line but has no flag for
//! credentials. With `Fetch.enable { handleAuthRequests }` every request on
//! the tab pauses; paused requests are continued untouched and proxy auth
//! challenges are answered with the configured credentials.

use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::cdp::{AuthRequired, CdpError, CdpResponse, PageSession, RequestPaused};

/// Username and password for an authenticating proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl ProxyCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Enable request interception on `session` and answer its events in the
/// background for as long as the session lives.
pub async fn install(session: Arc<PageSession>, credentials: ProxyCredentials) -> Result<(), CdpError> {
    let Some(mut events) = session.take_events() else {
        debug!(target_id = session.target_id(), "Proxy auth already installed");
        return Ok(());
    };

    session
        .call(
            "Fetch.enable",
            Some(json!({
                "handleAuthRequests": true,
                "patterns": [{"urlPattern": "*"}],
            })),
        )
        .await?;
    debug!(target_id = session.target_id(), "Proxy auth handler installed");

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some((method, params)) = reply_for(&event, &credentials) else {
                continue;
            };
            if let Err(e) = session.call(method, Some(params)).await {
                warn!("{} failed: {}", method, e);
                if e.is_target_gone() {
                    break;
                }
            }
        }
        debug!(target_id = session.target_id(), "Proxy auth handler stopped");
    });

    Ok(())
}

/// The command answering a Fetch event, if it needs one.
pub fn reply_for(event: &CdpResponse, credentials: &ProxyCredentials) -> Option<(&'static str, Value)> {
    let params = event.params.clone()?;
    match event.method.as_deref()? {
        "Fetch.requestPaused" => {
            let paused: RequestPaused = serde_json::from_value(params).ok()?;
            Some((
                "Fetch.continueRequest",
                json!({"requestId": paused.request_id}),
            ))
        }
        "Fetch.authRequired" => {
            let auth: AuthRequired = serde_json::from_value(params).ok()?;
            let from_proxy = auth
                .auth_challenge
                .source
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("proxy"));
            let response = if from_proxy {
                debug!(origin = %auth.auth_challenge.origin, "Answering proxy auth challenge");
                json!({
                    "response": "ProvideCredentials",
                    "username": credentials.username,
                    "password": credentials.password,
                })
            } else {
                json!({"response": "Default"})
            };
            Some((
                "Fetch.continueWithAuth",
                json!({
                    "requestId": auth.request_id,
                    "authChallengeResponse": response,
                }),
            ))
        }
        _ => None,
    }
}
