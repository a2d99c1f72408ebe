//! Commands scoped to one page target.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use super::client::Dispatcher;
use super::error::CdpError;
use super::protocol::CdpResponse;

/// Flattened session multiplexed over the browser socket.
pub struct PageSession {
    target_id: String,
    session_id: String,
    dispatcher: Arc<Dispatcher>,
    events: Mutex<Option<mpsc::UnboundedReceiver<CdpResponse>>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        dispatcher: Arc<Dispatcher>,
        event_rx: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            dispatcher,
            events: Mutex::new(Some(event_rx)),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

        pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.dispatcher
            .call(method, params, Some(&self.session_id))
            .await
    }

    /// Take the event stream of this session. Only the first caller gets it.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<CdpResponse>> {
        self.events.lock().take()
    }

    /// Evaluate a JavaScript expression and return its value by copy.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("script threw");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Load `url` in this page.
    pub async fn navigate(&self, url: &str) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({"url": url})))
            .await?;
        if let Some(error) = result["errorText"].as_str() {
            return Err(CdpError::InvalidResponse(format!(
                "navigation to {} failed: {}",
                url, error
            )));
        }
        Ok(())
    }
}
