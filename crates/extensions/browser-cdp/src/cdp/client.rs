//! Browser-level DevTools socket with per-page session routing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::discovery::DevToolsEndpoint;
use super::error::CdpError;
use super::protocol::{CdpRequest, CdpResponse, WindowForTarget};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type PendingMap = Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>;
type EventHandlers = RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends commands over the browser socket and pairs them with responses.
///
/// Shared by the client and every page session attached through it.
pub(crate) struct Dispatcher {
    ws_tx: tokio::sync::Mutex<WsSink>,
    pending: PendingMap,
    request_id: AtomicU64,
}

impl Dispatcher {
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!(id, "-> {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("{} got no reply", method)))
            }
        }
    }

    fn resolve(&self, resp: CdpResponse) {
        let Some(id) = resp.id else {
            return;
        };
        let Some(tx) = self.pending.lock().remove(&id) else {
            return;
        };
        let result = match resp.error {
            Some(error) => Err(CdpError::Protocol {
                code: error.code,
                message: error.message,
            }),
            None => Ok(resp.result.unwrap_or(Value::Null)),
        };
        let _ = tx.send(result);
    }
}

/// Browser-level CDP connection.
pub struct CdpClient {
    browser_ws_url: String,
    dispatcher: Arc<Dispatcher>,
    event_handlers: Arc<EventHandlers>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to the browser socket advertised by `endpoint`.
    pub async fn connect(endpoint: &DevToolsEndpoint) -> Result<Self, CdpError> {
        let version = endpoint.version().await?;
        debug!(browser = %version.browser, "DevTools endpoint answered");

        let browser_ws_url = version.web_socket_debugger_url;
        let (ws_stream, _) = tokio_tungstenite::connect_async(&browser_ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("browser socket {}: {}", browser_ws_url, e)))?;

        let (sink, source) = ws_stream.split();
        let dispatcher = Arc::new(Dispatcher {
            ws_tx: tokio::sync::Mutex::new(sink),
            pending: Mutex::new(HashMap::new()),
            request_id: AtomicU64::new(1),
        });
        let event_handlers: Arc<EventHandlers> = Arc::new(RwLock::new(HashMap::new()));

        let recv_task = {
            let dispatcher = dispatcher.clone();
            let event_handlers = event_handlers.clone();
            tokio::spawn(async move {
                Self::pump(source, dispatcher, event_handlers).await;
            })
        };

        debug!(url = %browser_ws_url, "Browser socket open");

        Ok(Self {
            browser_ws_url,
            dispatcher,
            event_handlers,
            recv_task,
        })
    }

    async fn pump(
        mut source: WsSource,
        dispatcher: Arc<Dispatcher>,
        event_handlers: Arc<EventHandlers>,
    ) {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    trace!("<- {}", text);
                    let resp = match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => resp,
                        Err(e) => {
                            warn!("Dropping unreadable DevTools frame: {}", e);
                            continue;
                        }
                    };
                    if resp.id.is_some() {
                        dispatcher.resolve(resp);
                    } else if resp.method.is_some() {
                        let session_id = resp.session_id.clone().unwrap_or_default();
                        if let Some(tx) = event_handlers.read().await.get(&session_id) {
                            let _ = tx.send(resp);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Browser socket closed by peer");
                    break;
                }
                Err(e) => {
                    error!("Browser socket failed: {}", e);
                    break;
                }
                _ => {}
            }
        }
        // Dropping the senders wakes every waiter with SessionClosed.
        dispatcher.pending.lock().clear();
        event_handlers.write().await.clear();
    }

    /// Send a browser-level CDP command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.dispatcher.call(method, params, None).await
    }

    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// Attach to an existing target with a flattened session.
    pub async fn attach(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("attach reply has no sessionId".to_string()))?
            .to_string();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_handlers
            .write()
            .await
            .insert(session_id.clone(), event_tx);

        debug!(target_id, session_id = %session_id, "Attached to target");
        Ok(PageSession::new(
            target_id.to_string(),
            session_id,
            self.dispatcher.clone(),
            event_rx,
        ))
    }

    /// Stop routing events to a session that is no longer used.
    pub async fn detach(&self, session: &PageSession) {
        self.event_handlers.write().await.remove(session.session_id());
        if let Err(e) = self
            .call(
                "Target.detachFromTarget",
                Some(json!({"sessionId": session.session_id()})),
            )
            .await
        {
            debug!("Detach from {} failed: {}", session.target_id(), e);
        }
    }

    /// Id of the browser window holding `target_id`.
    pub async fn window_for_target(&self, target_id: &str) -> Result<i64, CdpError> {
        let result = self
            .call(
                "Browser.getWindowForTarget",
                Some(json!({"targetId": target_id})),
            )
            .await?;
        let window: WindowForTarget = serde_json::from_value(result)?;
        Ok(window.window_id)
    }

    /// Open a new tab at `url` and return its target id.
    pub async fn create_target(&self, url: &str) -> Result<String, CdpError> {
        let result = self
            .call("Target.createTarget", Some(json!({"url": url})))
            .await?;
        result["targetId"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("createTarget reply has no targetId".to_string()))
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
