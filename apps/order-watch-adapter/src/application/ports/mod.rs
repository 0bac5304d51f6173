//! Port Interfaces
//!
//! Defines the interfaces (ports) between the adapters and their
//! surroundings, following the Hexagonal Architecture pattern.
//!
//! ## Driver Port (Inbound)
//!
//! - `OrderWatcherAdapter`: contract both backends expose to the owner
//!
//! ## Driven Ports (Outbound)
//!
//! - `LifecycleSink`: owner callback receiving Add/Remove batches
//! - `OrderHasher`: order hash computation
//! - `FillabilityValidator`: on-chain fillability simulation
//! - `OrderStateWatcher`: local order watcher with validity notifications

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::lifecycle::LifecycleBatch;
use crate::domain::order::{OrderHash, SignedOrder};
use crate::domain::validation::ValidationResults;
use crate::error::AdapterError;

// =============================================================================
// Owner-facing contract
// =============================================================================

/// Contract shared by the remote and local backends.
#[async_trait]
pub trait OrderWatcherAdapter: Send + Sync {
    /// Submit orders for validation and watching.
    ///
    /// Every submitted order appears in exactly one of `accepted`/`rejected`.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport faults on an in-flight call or when
    /// the adapter is shutting down. Per-order failures are rejections.
    async fn add_orders(&self, orders: Vec<SignedOrder>) -> Result<ValidationResults, AdapterError>;

    /// Stop watching the given orders.
    fn remove_orders(&self, orders: &[SignedOrder]);

    /// Whether the owner should currently suppress this order.
    fn order_filter(&self, order: &SignedOrder) -> bool;
}

/// Receives lifecycle batches. Batches are never empty.
pub trait LifecycleSink: Send + Sync {
    /// Handle one batch.
    fn on_lifecycle_event(&self, batch: LifecycleBatch);
}

impl<F> LifecycleSink for F
where
    F: Fn(LifecycleBatch) + Send + Sync,
{
    fn on_lifecycle_event(&self, batch: LifecycleBatch) {
        self(batch);
    }
}

// =============================================================================
// Collaborators
// =============================================================================

/// Computes the content-addressed key of an order.
pub trait OrderHasher: Send + Sync {
    /// Hash the order.
    fn order_hash(&self, order: &SignedOrder) -> OrderHash;
}

/// Fillability simulation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Human-readable reason.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Simulates whether an order is fillable on chain.
#[async_trait]
pub trait FillabilityValidator: Send + Sync {
    /// Validate that `simulation_taker` could fill `order`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the order is not fillable.
    async fn validate_fillable(
        &self,
        order: &SignedOrder,
        simulation_taker: &str,
    ) -> Result<(), ValidationError>;
}

/// Validity change reported by the local order watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStateUpdate {
    /// Order the update refers to.
    pub order_hash: OrderHash,
    /// Whether the order is currently valid.
    pub is_valid: bool,
}

/// Local order watcher failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("order watcher error: {message}")]
pub struct WatcherError {
    /// Human-readable reason.
    pub message: String,
}

impl WatcherError {
    /// Create a new watcher error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Local order watcher that tracks order validity against the chain.
#[async_trait]
pub trait OrderStateWatcher: Send + Sync {
    /// Start watching an order.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError` when the watcher refuses the order.
    async fn add_order(&self, order: &SignedOrder) -> Result<(), WatcherError>;

    /// Stop watching an order.
    fn remove_order(&self, order_hash: &OrderHash);

    /// Subscribe to validity updates. Called once per adapter.
    fn subscribe(&self) -> mpsc::Receiver<Result<OrderStateUpdate, WatcherError>>;
}
