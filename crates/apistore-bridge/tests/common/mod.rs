//! Shared fixtures for bridge integration tests.
//!
//! Provides:
//! - MemoryEngine: a small in-memory document engine for the worker transport
//! - MockStoreServer: an HTTP + WebSocket store service on a local port
//! - RecordingSink: a change sink that keeps what it is given

#![allow(dead_code)]

use apistore_bridge::{BridgeResult, ChangeSink, ModelEngine, Notifier};
use apistore_protocol::{
    ChangeNotification, ChangePhase, ChangeRecord, DomainType, MessageEnvelope, OperationFailure,
    ReplyEnvelope,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

// =============================================================================
// MemoryEngine
// =============================================================================

/// Keeps endpoints and their operations. Deleting an endpoint notifies the
/// removal of each of its operations.
#[derive(Default)]
pub struct MemoryEngine {
    next: usize,
    endpoints: BTreeMap<String, Value>,
    operations: BTreeMap<String, (String, Value)>,
}

impl MemoryEngine {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{}-{}", prefix, self.next)
    }

    fn fail(message: impl Into<String>) -> OperationFailure {
        OperationFailure {
            message: message.into(),
            stack: Some("at MemoryEngine.handle".to_string()),
        }
    }
}

fn arg_str(arguments: &[Value], index: usize) -> Result<String, OperationFailure> {
    arguments
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| MemoryEngine::fail(format!("argument {} must be a string", index)))
}

fn with_id(init: Option<&Value>, id: &str) -> Value {
    let mut map = init.and_then(Value::as_object).cloned().unwrap_or_else(Map::new);
    map.insert("id".to_string(), json!(id));
    Value::Object(map)
}

impl ModelEngine for MemoryEngine {
    fn handle(
        &mut self,
        operation: &str,
        arguments: Vec<Value>,
        notifier: &Notifier,
    ) -> Result<Value, OperationFailure> {
        match operation {
            "addServer" => Ok(arguments.first().cloned().unwrap_or(Value::Null)),
            "addEndpoint" => {
                let id = self.fresh_id("ep");
                self.endpoints.insert(id.clone(), with_id(arguments.first(), &id));
                Ok(json!(id))
            }
            "listEndpoints" => Ok(Value::Array(self.endpoints.values().cloned().collect())),
            "getEndpoint" => {
                let id = arg_str(&arguments, 0)?;
                self.endpoints
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| Self::fail(format!("Endpoint {} not found", id)))
            }
            "addOperation" => {
                let endpoint = arg_str(&arguments, 0)?;
                if !self.endpoints.contains_key(&endpoint) {
                    return Err(Self::fail(format!("Endpoint {} not found", endpoint)));
                }
                let id = self.fresh_id("op");
                self.operations
                    .insert(id.clone(), (endpoint, with_id(arguments.get(1), &id)));
                Ok(json!(id))
            }
            "deleteEndpoint" => {
                let id = arg_str(&arguments, 0)?;
                if self.endpoints.remove(&id).is_none() {
                    return Err(Self::fail(format!("Endpoint {} not found", id)));
                }
                let children: Vec<String> = self
                    .operations
                    .iter()
                    .filter(|(_, (parent, _))| *parent == id)
                    .map(|(op, _)| op.clone())
                    .collect();
                for op in children {
                    self.operations.remove(&op);
                    notifier.notify(&ChangeNotification::new(
                        DomainType::Operation,
                        ChangePhase::Deleted,
                        ChangeRecord::deleted(op, DomainType::Operation).with_parent(id.clone()),
                    ));
                }
                Ok(Value::Null)
            }
            "generateRaml" => {
                let mut raml = String::from("#%RAML 1.0\n");
                for endpoint in self.endpoints.values() {
                    if let Some(path) = endpoint.get("path").and_then(Value::as_str) {
                        raml.push_str(path);
                        raml.push_str(":\n");
                    }
                }
                Ok(json!(raml))
            }
            other => Err(Self::fail(format!("Unsupported operation: {}", other))),
        }
    }
}

// =============================================================================
// RecordingSink
// =============================================================================

#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<(ChangePhase, ChangeRecord)>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<(ChangePhase, ChangeRecord)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeSink for RecordingSink {
    async fn record(&self, phase: ChangePhase, record: &ChangeRecord) -> BridgeResult<()> {
        self.records.lock().unwrap().push((phase, record.clone()));
        Ok(())
    }
}

// =============================================================================
// MockStoreServer
// =============================================================================

/// Local store service: session bootstrap, call endpoint and push channel.
pub struct MockStoreServer {
    port: u16,
    session: String,
    fail_status: Arc<Mutex<Option<u16>>>,
    calls: Arc<Mutex<Vec<MessageEnvelope>>>,
    push_tx: broadcast::Sender<String>,
    push_connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockStoreServer {
    /// Bind to a free port and start serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let session = Uuid::new_v4().to_string();
        let fail_status = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (push_tx, _) = broadcast::channel(64);
        let push_connections = Arc::new(AtomicUsize::new(0));

        let state = ServerState {
            session: session.clone(),
            fail_status: fail_status.clone(),
            calls: calls.clone(),
            push_tx: push_tx.clone(),
            push_connections: push_connections.clone(),
        };

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = state.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self {
            port,
            session,
            fail_status,
            calls,
            push_tx,
            push_connections,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Answer every call with this HTTP status from now on.
    pub fn fail_with(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub fn calls(&self) -> Vec<MessageEnvelope> {
        self.calls.lock().unwrap().clone()
    }

    pub fn push_connections(&self) -> usize {
        self.push_connections.load(Ordering::SeqCst)
    }

    /// Wait until `count` push channels are connected.
    pub async fn wait_push_connections(&self, count: usize) {
        for _ in 0..200 {
            if self.push_connections() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("push channel never connected");
    }

    /// Send a raw text frame to every connected push channel.
    pub fn push_raw(&self, text: impl Into<String>) {
        let _ = self.push_tx.send(text.into());
    }

    pub fn push(&self, notification: &ChangeNotification) {
        self.push_raw(notification.to_json().unwrap());
    }
}

impl Drop for MockStoreServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
struct ServerState {
    session: String,
    fail_status: Arc<Mutex<Option<u16>>>,
    calls: Arc<Mutex<Vec<MessageEnvelope>>>,
    push_tx: broadcast::Sender<String>,
    push_connections: Arc<AtomicUsize>,
}

/// Peek at the request head without consuming it.
async fn peek_head(stream: &TcpStream) -> std::io::Result<String> {
    let mut buf = vec![0u8; 4096];
    loop {
        let n = stream.peek(&mut buf).await?;
        let head = String::from_utf8_lossy(&buf[..n]).to_string();
        if head.contains("\r\n\r\n") || n == buf.len() {
            return Ok(head);
        }
        if n == 0 {
            return Ok(head);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

async fn serve(mut stream: TcpStream, state: ServerState) -> std::io::Result<()> {
    let head = peek_head(&stream).await?;
    if head.to_ascii_lowercase().contains("upgrade: websocket") {
        return serve_push(stream, state).await;
    }

    let (head, body) = read_request(&mut stream).await?;
    let request_line = head.lines().next().unwrap_or_default().to_string();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();

    let session_path = format!("/store/{}", state.session);
    let (status, body) = match (method, path) {
        ("POST", "/store") => (200, json!({ "id": state.session }).to_string()),
        ("POST", p) if p == session_path => {
            let envelope: MessageEnvelope = match serde_json::from_slice(&body) {
                Ok(envelope) => envelope,
                Err(e) => return write_response(&mut stream, 400, &e.to_string()).await,
            };
            state.calls.lock().unwrap().push(envelope.clone());

            let fail_status = *state.fail_status.lock().unwrap();
            match fail_status {
                Some(status) => (status, "store exploded".to_string()),
                None => {
                    // Echo the first argument back
                    let result = envelope.arguments.first().cloned().unwrap_or(Value::Null);
                    (200, ReplyEnvelope::success(envelope.id, result).to_json().unwrap())
                }
            }
        }
        _ => (404, "not found".to_string()),
    };

    write_response(&mut stream, status, &body).await
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok((String::from_utf8_lossy(&buf).to_string(), Vec::new()));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok((head, body))
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

async fn serve_push(stream: TcpStream, state: ServerState) -> std::io::Result<()> {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(_) => return Ok(()),
    };
    let (mut write, mut read) = ws.split();

    let mut frames = state.push_tx.subscribe();
    state.push_connections.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(text) => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    Ok(())
}
