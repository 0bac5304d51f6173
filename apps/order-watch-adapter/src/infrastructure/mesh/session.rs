//! Mesh Session Ports
//!
//! Transport-level interfaces the connection manager drives. The WebSocket
//! implementation lives in [`super::client`]; tests substitute in-memory
//! sessions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::codec::CodecError;
use super::messages::{
    JsonRpcError, WireGetOrdersResponse, WireOrderEvent, WireSignedOrder, WireValidationResults,
};

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur talking to a Mesh node.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// No response within the request timeout.
    #[error("{method} timed out after {timeout:?}")]
    Timeout {
        /// Method that timed out.
        method: &'static str,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The session is closed.
    #[error("connection closed")]
    ConnectionClosed,
}

impl From<JsonRpcError> for MeshError {
    fn from(error: JsonRpcError) -> Self {
        Self::Rpc {
            code: error.code,
            message: error.message,
        }
    }
}

// =============================================================================
// Channels and Notifications
// =============================================================================

/// Subscription channels offered by Mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshChannel {
    /// Liveness ticks, roughly every five seconds.
    Heartbeat,
    /// Order events.
    Orders,
}

impl MeshChannel {
    /// Get the channel name sent to `mesh_subscribe`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Orders => "orders",
        }
    }
}

impl fmt::Display for MeshChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Push notification routed to its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshNotification {
    /// A heartbeat tick.
    Heartbeat,
    /// A batch of order events.
    OrderEvents(Vec<WireOrderEvent>),
}

// =============================================================================
// Ports
// =============================================================================

/// Request side of an open Mesh session.
#[async_trait]
pub trait MeshSession: Send + Sync {
    /// Open a subscription and return its id.
    ///
    /// # Errors
    ///
    /// Returns `MeshError` on transport or RPC failure.
    async fn subscribe(&self, channel: MeshChannel) -> Result<String, MeshError>;

    /// Submit one chunk of orders.
    ///
    /// # Errors
    ///
    /// Returns `MeshError` on transport or RPC failure.
    async fn add_orders(
        &self,
        orders: Vec<WireSignedOrder>,
    ) -> Result<WireValidationResults, MeshError>;

    /// Fetch one page of the current order set.
    ///
    /// # Errors
    ///
    /// Returns `MeshError` on transport or RPC failure.
    async fn get_orders(
        &self,
        page: u32,
        per_page: usize,
        snapshot_id: &str,
    ) -> Result<WireGetOrdersResponse, MeshError>;

    /// Close the session. Pending and later requests fail with
    /// `MeshError::ConnectionClosed`.
    async fn close(&self);
}

/// A freshly opened session plus its notification stream.
///
/// The stream ends when the transport closes.
pub struct MeshConnection {
    /// Request handle.
    pub session: Arc<dyn MeshSession>,
    /// Routed push notifications.
    pub notifications: mpsc::Receiver<MeshNotification>,
}

impl fmt::Debug for MeshConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshConnection").finish_non_exhaustive()
    }
}

/// Opens Mesh sessions.
#[async_trait]
pub trait MeshConnector: Send + Sync {
    /// Open a new transport connection.
    ///
    /// # Errors
    ///
    /// Returns `MeshError` if the transport cannot be opened.
    async fn connect(&self) -> Result<MeshConnection, MeshError>;
}
