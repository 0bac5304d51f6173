//! Mesh Adapter
//!
//! Remote backend of the [`OrderWatcherAdapter`] contract. Owns the
//! connection manager task; submissions go through the batcher on whatever
//! session is current.
//!
//! Mesh tracks order validity itself, so `remove_orders` has nothing to do
//! and `order_filter` never suppresses an order.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::batcher::submit_in_chunks;
use super::client::{MeshClientConfig, WsMeshConnector};
use super::connection::{ConnectionManager, ConnectionState, SessionWatch};
use super::session::MeshConnector;
use crate::MeshSettings;
use crate::application::ports::{LifecycleSink, OrderWatcherAdapter};
use crate::domain::order::SignedOrder;
use crate::domain::validation::ValidationResults;
use crate::error::AdapterError;

/// Order watcher backed by a remote Mesh node.
pub struct MeshAdapter {
    sessions: SessionWatch,
    submit_batch_size: usize,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MeshAdapter {
    /// Connect to the node at `settings.endpoint` over WebSocket.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn connect(settings: &MeshSettings, sink: Arc<dyn LifecycleSink>) -> Self {
        let connector = WsMeshConnector::new(MeshClientConfig::from_mesh_settings(settings));
        Self::spawn(settings, Arc::new(connector), sink)
    }

    /// Start the connection manager on `connector`.
    ///
    /// Returns immediately; the first connection is made in the background.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(
        settings: &MeshSettings,
        connector: Arc<dyn MeshConnector>,
        sink: Arc<dyn LifecycleSink>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (manager, sessions) =
            ConnectionManager::new(settings, connector, sink, cancel.clone());
        let task = tokio::spawn(manager.run());

        tracing::info!(endpoint = %settings.endpoint, "Mesh adapter started");

        Self {
            sessions,
            submit_batch_size: settings.submit_batch_size,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.sessions.state()
    }

    /// Watch on the connection state.
    #[must_use]
    pub const fn sessions(&self) -> &SessionWatch {
        &self.sessions
    }

    /// Stop the connection manager and wait for it to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Mesh connection manager task failed");
        }
    }
}

impl Drop for MeshAdapter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for MeshAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshAdapter")
            .field("state", &self.connection_state())
            .field("submit_batch_size", &self.submit_batch_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl OrderWatcherAdapter for MeshAdapter {
    async fn add_orders(
        &self,
        orders: Vec<SignedOrder>,
    ) -> Result<ValidationResults, AdapterError> {
        submit_in_chunks(&self.sessions, orders, self.submit_batch_size).await
    }

    fn remove_orders(&self, orders: &[SignedOrder]) {
        tracing::debug!(
            orders = orders.len(),
            "Ignoring remove request, Mesh tracks order validity"
        );
    }

    fn order_filter(&self, _order: &SignedOrder) -> bool {
        false
    }
}
