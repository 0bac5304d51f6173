#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::cast_possible_truncation
    )
)]

//! Order Watch Adapter - Order Lifecycle Feed
//!
//! Keeps an order book owner informed about which 0x orders are tradeable.
//! Two interchangeable backends implement the same contract:
//!
//! - [`MeshAdapter`]: a persistent JSON-RPC session to a Mesh relay node
//!   with heartbeat supervision, reconnection, snapshot on connect and
//!   chunked submission
//! - [`LocalWatcherAdapter`]: local fillability simulation plus an order
//!   state watcher, with invalid orders shadowed for a grace margin before
//!   eviction
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Orders, lifecycle batches, validation results, event
//!   classification and shadow tracking
//!
//! - **Application**: Ports and the local backend
//!   - `ports`: Owner contract and local collaborators
//!   - `services`: Local watcher adapter
//!
//! - **Infrastructure**: Adapters and ambient concerns
//!   - `mesh`: WebSocket JSON-RPC client and remote adapter
//!   - `config`: Environment configuration
//!   - `metrics`: `metrics` facade instrumentation
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! Mesh node ──WS──► ConnectionManager ──► classify ──┐
//!                        ▲                            ├──► LifecycleSink (owner)
//! add_orders ──► Batcher ┘   OrderStateWatcher ──► shadow sweep ──┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core order lifecycle types with no I/O.
pub mod domain;

/// Application layer - Ports and the local backend.
pub mod application;

/// Infrastructure layer - Mesh client and ambient concerns.
pub mod infrastructure;

/// Errors surfaced to the owner.
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::events::{ClassifiedEvents, OrderEventKind, UnknownEventKind};
pub use domain::lifecycle::{LifecycleBatch, LifecycleKind};
pub use domain::order::{OrderHash, SignedOrder};
pub use domain::shadow::ShadowOrderTracker;
pub use domain::validation::{
    AcceptedOrder, RejectedOrder, RejectionKind, RejectionReason, ValidationResults,
};

// Ports
pub use application::ports::{
    FillabilityValidator, LifecycleSink, OrderHasher, OrderStateUpdate, OrderStateWatcher,
    OrderWatcherAdapter, ValidationError, WatcherError,
};

// Backends
pub use application::services::LocalWatcherAdapter;
pub use infrastructure::mesh::{ConnectionState, MeshAdapter};

// Errors
pub use error::AdapterError;

// Infrastructure config
pub use infrastructure::config::{
    AdapterConfig, ConfigError, DEFAULT_MESH_ENDPOINT, MeshSettings, NULL_ADDRESS, ShadowSettings,
};

// Metrics
pub use infrastructure::metrics::describe_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, init as init_telemetry};
