//! Remote store transport.
//!
//! Calls travel as one HTTP request each; the response body is the reply.
//! Change notifications arrive on a separate WebSocket opened once per
//! session.

use super::{Fault, FaultHandler, MessageHandler, Transport, TransportHandlers};
use crate::error::{BridgeError, BridgeResult};
use apistore_protocol::{ChangeNotification, Inbound, MessageEnvelope, ReplyEnvelope};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct SessionCreated {
    id: String,
}

/// Transport talking to a remote store service.
pub struct RemoteTransport {
    client: reqwest::Client,
    base: Url,
    session: Arc<RwLock<Option<String>>>,
    handlers: TransportHandlers,
    push: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteTransport {
    /// Create a transport for the service at `base`.
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Parse `base` and create a transport for it.
    pub fn from_url(base: &str) -> BridgeResult<Self> {
        Ok(Self::new(Url::parse(base)?))
    }

    /// Create a transport with a preconfigured HTTP client.
    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self {
            client,
            base,
            session: Arc::new(RwLock::new(None)),
            handlers: TransportHandlers::default(),
            push: Mutex::new(None),
        }
    }

    /// Base URL of the service.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Current session id, if bootstrapped.
    pub fn session_id(&self) -> Option<String> {
        self.session.read().clone()
    }

    /// Bootstrap a new session. Required before any call.
    pub async fn init_session(&self) -> BridgeResult<String> {
        let url = self.store_url(&[])?;
        debug!(url = %url, "Creating store session");

        let response = self.client.post(url).send().await?.error_for_status()?;
        let created: SessionCreated = response.json().await?;

        info!(session = %created.id, "Store session created");
        *self.session.write() = Some(created.id.clone());
        Ok(created.id)
    }

    /// Reuse a session created earlier.
    pub fn attach_session(&self, session: impl Into<String>) {
        let session = session.into();
        debug!(session = %session, "Attaching to existing session");
        *self.session.write() = Some(session);
    }

    fn require_session(&self, action: &str) -> BridgeResult<String> {
        self.session_id().ok_or_else(|| {
            BridgeError::NotInitialized(format!("{} before the session was created", action))
        })
    }

    /// `{base}/store/{segments...}`
    fn store_url(&self, segments: &[&str]) -> BridgeResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BridgeError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("store")
            .extend(segments);
        Ok(url)
    }

    /// Push channel URL for a session, on the ws/wss scheme matching the base.
    fn events_url(&self, session: &str) -> BridgeResult<Url> {
        let mut url = self.store_url(&[session, "events"])?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| BridgeError::InvalidUrl(url.to_string()))?;
        Ok(url)
    }
}

/// Turn an HTTP response into the reply for request `id`.
fn reply_from_http(id: u64, status: StatusCode, body: &str) -> ReplyEnvelope {
    let parsed = ReplyEnvelope::from_json(body).ok().filter(|reply| reply.id == id);

    if !status.is_success() {
        return match parsed {
            Some(reply) if reply.error => reply,
            _ => ReplyEnvelope::failure(
                id,
                format!("HTTP {}: {}", status.as_u16(), body.trim()),
                None,
            ),
        };
    }

    match parsed {
        Some(reply) => reply,
        None => ReplyEnvelope::failure(id, format!("Invalid reply body: {}", body.trim()), None),
    }
}

/// Deliver one push frame, skipping unknown event names.
fn handle_push_frame(handlers: &TransportHandlers, text: &str) {
    let notification = match ChangeNotification::from_json(text) {
        Ok(notification) => notification,
        Err(e) => {
            warn!(error = %e, "Dropping malformed push frame");
            return;
        }
    };

    if notification.kind().is_none() {
        debug!(event = %notification.event, "Ignoring unrecognized push event");
        return;
    }

    handlers.deliver(Inbound::Change(notification));
}

#[async_trait]
impl Transport for RemoteTransport {
    async fn send(&self, envelope: MessageEnvelope) -> BridgeResult<()> {
        let session = self.require_session(&format!("call to {}", envelope.operation))?;
        let url = self.store_url(&[&session])?;
        let id = envelope.id;

        debug!(id, operation = %envelope.operation, "Posting call");
        let request = self.client.post(url).json(&envelope);
        let handlers = self.handlers.clone();

        tokio::spawn(async move {
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let reply = match response.text().await {
                        Ok(body) => reply_from_http(id, status, &body),
                        Err(e) => ReplyEnvelope::failure(
                            id,
                            format!("Failed to read reply body: {}", e),
                            None,
                        ),
                    };
                    handlers.deliver(Inbound::Reply(reply));
                }
                Err(e) => {
                    warn!(id, error = %e, "Call did not reach the store service");
                    handlers.fault(Fault::request(id, e.to_string()));
                }
            }
        });

        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        self.handlers.set_message(handler);
    }

    fn on_fault(&self, handler: FaultHandler) {
        self.handlers.set_fault(handler);
    }

    async fn open_notifications(&self) -> BridgeResult<()> {
        let session = self.require_session("push channel")?;
        let mut push = self.push.lock().await;

        if push.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!(session = %session, "Push channel already open");
            return Ok(());
        }

        let url = self.events_url(&session)?;
        info!(url = %url, "Opening push channel");
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();
        let handlers = self.handlers.clone();

        *push = Some(tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => handle_push_frame(&handlers, &text),
                    Ok(Message::Ping(data)) => {
                        if write.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!(session = %session, "Push channel closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(session = %session, error = %e, "Push channel error");
                        break;
                    }
                }
            }
            debug!(session = %session, "Push channel reader stopped");
        }));

        Ok(())
    }

    async fn close(&self) {
        if let Some(task) = self.push.lock().await.take() {
            task.abort();
            info!("Push channel closed");
        }
    }
}

impl Drop for RemoteTransport {
    fn drop(&mut self) {
        if let Some(task) = self.push.get_mut().take() {
            task.abort();
        }
    }
}
