//! Mesh WebSocket Client
//!
//! JSON-RPC 2.0 session over a single WebSocket connection to a Mesh node.
//!
//! # Protocol
//!
//! - Requests carry a numeric `id`; responses are matched back by that id.
//! - `mesh_subscribe` returns a subscription id. Pushes arrive as
//!   `mesh_subscription` notifications tagged with that id and are routed to
//!   the [`MeshChannel`] they were opened for.
//!
//! Each session runs one reader task and one writer task. Closing the session
//! (explicitly, on drop, or because the socket ended) fails every in-flight
//! request with [`MeshError::ConnectionClosed`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, JsonRpcCodec, MeshFrame};
use super::messages::{
    JsonRpcError, METHOD_ADD_ORDERS, METHOD_GET_ORDERS, METHOD_SUBSCRIBE, WireGetOrdersResponse,
    WireOrderEvent, WireSignedOrder, WireValidationResults,
};
use super::session::{
    MeshChannel, MeshConnection, MeshConnector, MeshError, MeshNotification, MeshSession,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Waiter of an in-flight request.
///
/// A `mesh_subscribe` waiter carries its channel so the reader can register
/// the subscription before any notification queued behind the response is
/// routed.
struct PendingResponse {
    tx: oneshot::Sender<Result<Value, JsonRpcError>>,
    subscribes: Option<MeshChannel>,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Mesh WebSocket client.
#[derive(Debug, Clone)]
pub struct MeshClientConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:60557`.
    pub url: String,
    /// Timeout applied to the handshake and to each request.
    pub request_timeout: Duration,
    /// Capacity of the notification channel.
    pub notification_capacity: usize,
}

impl MeshClientConfig {
    /// Create a configuration with default timeouts.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: Duration::from_secs(30),
            notification_capacity: 1024,
        }
    }

    /// Create configuration from `MeshSettings`.
    #[must_use]
    pub fn from_mesh_settings(settings: &crate::MeshSettings) -> Self {
        Self {
            url: settings.endpoint.clone(),
            request_timeout: settings.request_timeout,
            notification_capacity: settings.notification_capacity,
        }
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Opens WebSocket sessions to a Mesh node.
#[derive(Debug, Clone)]
pub struct WsMeshConnector {
    config: MeshClientConfig,
    codec: JsonRpcCodec,
}

impl WsMeshConnector {
    /// Create a new connector.
    #[must_use]
    pub fn new(config: MeshClientConfig) -> Self {
        // Already installed by the host is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();

        Self {
            config,
            codec: JsonRpcCodec::new(),
        }
    }
}

#[async_trait]
impl MeshConnector for WsMeshConnector {
    async fn connect(&self) -> Result<MeshConnection, MeshError> {
        tracing::info!(url = %self.config.url, "Connecting to Mesh");

        let (ws_stream, _response) = tokio::time::timeout(
            self.config.request_timeout,
            tokio_tungstenite::connect_async(self.config.url.as_str()),
        )
        .await
        .map_err(|_| {
            MeshError::ConnectionFailed(format!(
                "handshake timed out after {:?}",
                self.config.request_timeout
            ))
        })??;

        let (write, read) = ws_stream.split();
        let shared = Arc::new(SessionShared::new());
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (notification_tx, notification_rx) =
            mpsc::channel(self.config.notification_capacity.max(1));

        tokio::spawn(run_writer(write, outbound_rx, Arc::clone(&shared)));
        tokio::spawn(run_reader(
            read,
            notification_tx,
            outbound_tx.clone(),
            Arc::clone(&shared),
            self.codec.clone(),
        ));

        let session = WsMeshSession {
            shared,
            outbound: outbound_tx,
            codec: self.codec.clone(),
            request_timeout: self.config.request_timeout,
        };

        Ok(MeshConnection {
            session: Arc::new(session),
            notifications: notification_rx,
        })
    }
}

// =============================================================================
// Session
// =============================================================================

/// State shared between a session handle and its I/O tasks.
struct SessionShared {
    pending: Mutex<HashMap<u64, PendingResponse>>,
    subscriptions: RwLock<HashMap<String, MeshChannel>>,
    next_id: AtomicU64,
    closed: CancellationToken,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: CancellationToken::new(),
        }
    }

    fn shutdown(&self) {
        self.closed.cancel();
        // Dropping the senders wakes every waiter with a receive error.
        self.pending.lock().clear();
    }

    fn forget(&self, id: u64) {
        self.pending.lock().remove(&id);
    }
}

/// Request handle of an open WebSocket session.
pub struct WsMeshSession {
    shared: Arc<SessionShared>,
    outbound: mpsc::UnboundedSender<Message>,
    codec: JsonRpcCodec,
    request_timeout: Duration,
}

impl WsMeshSession {
    /// Whether the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R, MeshError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        self.call_tracked(method, params, None).await
    }

    async fn call_tracked<P, R>(
        &self,
        method: &'static str,
        params: P,
        subscribes: Option<MeshChannel>,
    ) -> Result<R, MeshError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        if self.is_closed() {
            return Err(MeshError::ConnectionClosed);
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let text = self.codec.encode_request(id, method, params)?;

        let (response_tx, response_rx) = oneshot::channel();
        self.shared.pending.lock().insert(
            id,
            PendingResponse {
                tx: response_tx,
                subscribes,
            },
        );

        if self.outbound.send(Message::Text(text.into())).is_err() {
            self.shared.forget(id);
            return Err(MeshError::ConnectionClosed);
        }

        tracing::trace!(id, method, "Mesh request sent");

        let outcome = tokio::select! {
            () = self.shared.closed.cancelled() => {
                self.shared.forget(id);
                return Err(MeshError::ConnectionClosed);
            }
            result = tokio::time::timeout(self.request_timeout, response_rx) => match result {
                Err(_) => {
                    self.shared.forget(id);
                    return Err(MeshError::Timeout {
                        method,
                        timeout: self.request_timeout,
                    });
                }
                Ok(Err(_)) => return Err(MeshError::ConnectionClosed),
                Ok(Ok(outcome)) => outcome,
            }
        };

        let value = outcome?;
        serde_json::from_value(value).map_err(|e| MeshError::Codec(CodecError::Json(e)))
    }
}

#[async_trait]
impl MeshSession for WsMeshSession {
    async fn subscribe(&self, channel: MeshChannel) -> Result<String, MeshError> {
        self.call_tracked(METHOD_SUBSCRIBE, [channel.as_str()], Some(channel))
            .await
    }

    async fn add_orders(
        &self,
        orders: Vec<WireSignedOrder>,
    ) -> Result<WireValidationResults, MeshError> {
        self.call(METHOD_ADD_ORDERS, (orders,)).await
    }

    async fn get_orders(
        &self,
        page: u32,
        per_page: usize,
        snapshot_id: &str,
    ) -> Result<WireGetOrdersResponse, MeshError> {
        self.call(METHOD_GET_ORDERS, (page, per_page, snapshot_id))
            .await
    }

    async fn close(&self) {
        if !self.is_closed() {
            tracing::debug!("Closing Mesh session");
        }
        self.shared.shutdown();
    }
}

impl Drop for WsMeshSession {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

// =============================================================================
// I/O Tasks
// =============================================================================

async fn run_writer(
    mut write: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    shared: Arc<SessionShared>,
) {
    loop {
        tokio::select! {
            () = shared.closed.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            msg = outbound.recv() => {
                let Some(msg) = msg else { break };
                if let Err(e) = write.send(msg).await {
                    tracing::warn!(error = %e, "Mesh write failed");
                    shared.shutdown();
                    break;
                }
            }
        }
    }
}

async fn run_reader(
    mut read: SplitStream<WsStream>,
    notifications: mpsc::Sender<MeshNotification>,
    outbound: mpsc::UnboundedSender<Message>,
    shared: Arc<SessionShared>,
    codec: JsonRpcCodec,
) {
    loop {
        let msg = tokio::select! {
            () = shared.closed.cancelled() => break,
            msg = read.next() => msg,
        };

        match msg {
            Some(Ok(Message::Text(text))) => {
                if !route_frame(text.as_str(), &codec, &shared, &notifications).await {
                    break;
                }
            }
            Some(Ok(Message::Binary(data))) => {
                if let Ok(text) = std::str::from_utf8(&data) {
                    if !route_frame(text, &codec, &shared, &notifications).await {
                        break;
                    }
                } else {
                    tracing::warn!(len = data.len(), "Received non-UTF8 binary message");
                }
            }
            Some(Ok(Message::Ping(data))) => {
                let _ = outbound.send(Message::Pong(data));
            }
            Some(Ok(Message::Close(_))) => {
                tracing::info!("Mesh sent close frame");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Mesh read failed");
                break;
            }
            None => {
                tracing::info!("Mesh stream ended");
                break;
            }
        }
    }

    shared.shutdown();
}

/// Route one text frame. Returns `false` once nobody listens for notifications.
async fn route_frame(
    text: &str,
    codec: &JsonRpcCodec,
    shared: &SessionShared,
    notifications: &mpsc::Sender<MeshNotification>,
) -> bool {
    let frame = match codec.decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring undecodable Mesh frame");
            return true;
        }
    };

    match frame {
        MeshFrame::Response { id, outcome } => {
            let waiter = shared.pending.lock().remove(&id);
            match waiter {
                Some(waiter) => {
                    if let (Some(channel), Ok(Value::String(subscription))) =
                        (waiter.subscribes, &outcome)
                    {
                        shared
                            .subscriptions
                            .write()
                            .insert(subscription.clone(), channel);
                        tracing::debug!(%channel, %subscription, "Mesh subscription opened");
                    }
                    let _ = waiter.tx.send(outcome);
                }
                None => tracing::debug!(id, "Response for unknown or expired request"),
            }
            true
        }
        MeshFrame::Notification(params) => {
            let channel = shared
                .subscriptions
                .read()
                .get(&params.subscription)
                .copied();

            let notification = match channel {
                Some(MeshChannel::Heartbeat) => MeshNotification::Heartbeat,
                Some(MeshChannel::Orders) => {
                    match serde_json::from_value::<Option<Vec<WireOrderEvent>>>(params.result) {
                        Ok(events) => MeshNotification::OrderEvents(events.unwrap_or_default()),
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring malformed order events");
                            return true;
                        }
                    }
                }
                None => {
                    tracing::trace!(
                        subscription = %params.subscription,
                        "Notification for unknown subscription"
                    );
                    return true;
                }
            };

            notifications.send(notification).await.is_ok()
        }
    }
}
