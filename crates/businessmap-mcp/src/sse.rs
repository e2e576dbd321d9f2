//! SSE transport.
//!
//! - `GET /sse` opens an event stream. The first event is `connected` with an
//!   empty object payload; idle streams receive keep-alive comments.
//! - `POST /json-rpc` takes one request envelope and answers with one
//!   response envelope.
//! - `GET /health` answers `OK`.
//!
//! Live streams are tracked in a [`ClientRegistry`] owned by the server
//! instance. A stream removes itself from the registry when it is dropped,
//! which is what happens when the HTTP connection closes. Each client has a
//! bounded queue; events for a client that stops reading are dropped.
//! Shutting the registry down ends every open stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};

/// Opaque identifier of a connected stream.
pub type ClientId = u64;

/// Events held for one client before further events are dropped for it.
pub const CLIENT_QUEUE_CAPACITY: usize = 64;

/// Event queued for one client.
#[derive(Debug, Clone, PartialEq)]
pub struct SseMessage {
    pub event: String,
    pub data: String,
}

impl SseMessage {
    pub fn new(event: impl Into<String>, data: &Value) -> Self {
        Self {
            event: event.into(),
            data: data.to_string(),
        }
    }

    fn into_event(self) -> Event {
        Event::default().event(self.event).data(self.data)
    }
}

// =============================================================================
// Client registry
// =============================================================================

struct RegistryInner {
    next_id: AtomicU64,
    clients: Mutex<HashMap<ClientId, mpsc::Sender<SseMessage>>>,
    shutdown: CancellationToken,
}

impl Default for RegistryInner {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            clients: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Live SSE clients. Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<RegistryInner>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<ClientId, mpsc::Sender<SseMessage>>> {
        self.inner
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new client. Its stream starts with the `connected` event.
    pub fn connect(&self) -> ClientStream {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);

        // Queued before registration, so it always arrives first.
        let _ = tx.try_send(SseMessage::new("connected", &json!({})));
        self.clients().insert(id, tx);

        debug!(client_id = id, "SSE client registered");
        ClientStream {
            id,
            rx,
            registry: self.clone(),
        }
    }

    /// Remove a client. Returns false when it was already gone.
    pub fn disconnect(&self, id: ClientId) -> bool {
        let removed = self.clients().remove(&id).is_some();
        if removed {
            debug!(client_id = id, "SSE client removed");
        }
        removed
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients().is_empty()
    }

    /// Send an event to every live client and return how many received it.
    ///
    /// Delivery is best effort: a client whose queue is full misses the
    /// event, a client whose stream is already gone is pruned. Nothing is
    /// retried.
    pub fn broadcast(&self, event: &str, data: &Value) -> usize {
        let message = SseMessage::new(event, data);
        let mut clients = self.clients();

        let mut delivered = 0;
        clients.retain(|id, tx| match tx.try_send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(client_id = *id, "SSE client queue full, event dropped");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(client_id = *id, "Pruned closed SSE client");
                false
            }
        });

        debug!(event = event, delivered = delivered, "Broadcast sent");
        delivered
    }

    /// End every open stream. Streams opened afterwards end immediately.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    fn closed(&self) -> WaitForCancellationFutureOwned {
        self.inner.shutdown.clone().cancelled_owned()
    }
}

/// Event stream of one client. Dropping it deregisters the client.
pub struct ClientStream {
    id: ClientId,
    rx: mpsc::Receiver<SseMessage>,
    registry: ClientRegistry,
}

impl ClientStream {
    pub fn id(&self) -> ClientId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<SseMessage> {
        self.rx.recv().await
    }
}

impl Stream for ClientStream {
    type Item = SseMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        if self.registry.disconnect(self.id) {
            info!(client_id = self.id, "SSE client disconnected");
        }
    }
}

// =============================================================================
// HTTP layer
// =============================================================================

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    clients: ClientRegistry,
}

/// Build the SSE transport router.
pub fn router(dispatcher: Dispatcher, clients: ClientRegistry) -> Router {
    Router::new()
        .route("/sse", get(sse_handler))
        .route("/json-rpc", post(json_rpc_handler))
        .route("/health", get(health_handler))
        .with_state(AppState {
            dispatcher,
            clients,
        })
}

/// Bind `addr` and serve until Ctrl-C.
///
/// A bind failure is returned to the caller before anything is served.
pub async fn serve(
    addr: SocketAddr,
    dispatcher: Dispatcher,
    clients: ClientRegistry,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, dispatcher, clients, ctrl_c()).await
}

/// Serve on a bound listener until `signal` completes.
///
/// When the signal fires the registry is shut down, so open event streams
/// end and graceful shutdown does not wait on them.
pub async fn serve_listener<F>(
    listener: TcpListener,
    dispatcher: Dispatcher,
    clients: ClientRegistry,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "SSE transport listening");

    let registry = clients.clone();
    axum::serve(listener, router(dispatcher, clients))
        .with_graceful_shutdown(async move {
            signal.await;
            registry.shutdown();
        })
        .await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state.clients.connect();
    info!(
        client_id = stream.id(),
        clients = state.clients.len(),
        "SSE client connected"
    );

    let events = stream
        .take_until(state.clients.closed())
        .map(|message| Ok::<_, Infallible>(message.into_event()));

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn json_rpc_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Failed to parse JSON-RPC body");
            let response = JsonRpcResponse::error(
                salvage_id(&body),
                JsonRpcError::internal_error(&e.to_string()),
            );
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let tool = request.invoked_tool().map(str::to_string);
    let response = state.dispatcher.dispatch(request).await;

    if let Some(tool) = tool {
        state.clients.broadcast(
            "tool_invoked",
            &json!({ "tool": tool, "ok": !response.is_error() }),
        );
    }

    Json(response).into_response()
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Best-effort id of a body that is JSON but not a valid request.
fn salvage_id(body: &[u8]) -> RequestId {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .and_then(|id| serde_json::from_value(id).ok())
        .unwrap_or_default()
}
