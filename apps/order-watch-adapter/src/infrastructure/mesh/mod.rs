//! Mesh Relay Node Integration
//!
//! Remote backend: a persistent JSON-RPC 2.0 session over WebSocket to a 0x
//! Mesh node.
//!
//! # Modules
//!
//! - `messages`: wire types of the Mesh JSON-RPC API
//! - `codec`: order encoding and frame classification
//! - `session`: transport ports (`MeshConnector`, `MeshSession`)
//! - `client`: WebSocket implementation of the transport ports
//! - `heartbeat`: liveness watchdog
//! - `reconnect`: fixed-delay retry policy
//! - `connection`: connection state machine and notification delivery
//! - `snapshot`: paginated order set retrieval
//! - `batcher`: chunked submission
//! - `adapter`: `OrderWatcherAdapter` facade

pub mod adapter;
pub mod batcher;
pub mod client;
pub mod codec;
pub mod connection;
pub mod heartbeat;
pub mod messages;
pub mod reconnect;
pub mod session;
pub mod snapshot;

pub use adapter::MeshAdapter;
pub use client::{MeshClientConfig, WsMeshConnector, WsMeshSession};
pub use codec::{CodecError, JsonRpcCodec};
pub use connection::{ConnectionManager, ConnectionState, SessionWatch};
pub use session::{
    MeshChannel, MeshConnection, MeshConnector, MeshError, MeshNotification, MeshSession,
};
