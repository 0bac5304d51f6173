//! Adapter Metrics
//!
//! Records adapter metrics through the `metrics` facade. The embedding host
//! installs whatever recorder/exporter it uses; without one every call is a
//! no-op.
//!
//! # Metrics Categories
//!
//! - **Connection**: Mesh connection state, reconnects, heartbeat timeouts
//! - **Lifecycle**: Add/Remove batches and orders delivered to the owner
//! - **Submissions**: accepted/rejected order counts
//! - **Shadowing**: shadowed order count and evictions

use metrics::{counter, describe_counter, describe_gauge, gauge};

use crate::domain::lifecycle::LifecycleKind;
use crate::infrastructure::mesh::ConnectionState;

// =============================================================================
// Metric Registration
// =============================================================================

/// Describe every adapter metric to the installed recorder.
pub fn describe_metrics() {
    describe_gauge!(
        "order_watch_mesh_connected",
        "1 while a Mesh session is connected, 0 otherwise"
    );
    describe_counter!(
        "order_watch_mesh_reconnects_total",
        "Total Mesh reconnection attempts"
    );
    describe_counter!(
        "order_watch_mesh_heartbeat_timeouts_total",
        "Total Mesh sessions dropped for missing heartbeats"
    );

    describe_counter!(
        "order_watch_lifecycle_batches_total",
        "Total lifecycle batches delivered to the owner by kind"
    );
    describe_counter!(
        "order_watch_lifecycle_orders_total",
        "Total orders delivered to the owner by lifecycle kind"
    );

    describe_counter!(
        "order_watch_orders_accepted_total",
        "Total submitted orders accepted"
    );
    describe_counter!(
        "order_watch_orders_rejected_total",
        "Total submitted orders rejected"
    );

    describe_gauge!(
        "order_watch_shadowed_orders",
        "Number of orders currently shadowed"
    );
    describe_counter!(
        "order_watch_shadow_evictions_total",
        "Total shadowed orders evicted after the shadowing margin"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a Mesh connection state change.
pub fn record_connection_state(state: ConnectionState) {
    let connected = if state == ConnectionState::Connected {
        1.0
    } else {
        0.0
    };
    gauge!("order_watch_mesh_connected").set(connected);
}

/// Record a reconnection attempt.
pub fn record_reconnect_attempt() {
    counter!("order_watch_mesh_reconnects_total").increment(1);
}

/// Record a session dropped by the heartbeat watchdog.
pub fn record_heartbeat_timeout() {
    counter!("order_watch_mesh_heartbeat_timeouts_total").increment(1);
}

/// Record a lifecycle batch delivered to the owner.
pub fn record_lifecycle_batch(kind: LifecycleKind, orders: usize) {
    counter!("order_watch_lifecycle_batches_total", "kind" => kind.as_str()).increment(1);
    counter!("order_watch_lifecycle_orders_total", "kind" => kind.as_str())
        .increment(orders as u64);
}

/// Record the outcome of a submission.
pub fn record_submission(accepted: usize, rejected: usize) {
    counter!("order_watch_orders_accepted_total").increment(accepted as u64);
    counter!("order_watch_orders_rejected_total").increment(rejected as u64);
}

/// Record the current number of shadowed orders.
#[allow(clippy::cast_precision_loss)]
pub fn set_shadowed_orders(count: usize) {
    gauge!("order_watch_shadowed_orders").set(count as f64);
}

/// Record shadowed orders evicted by a sweep.
pub fn record_shadow_evictions(count: usize) {
    counter!("order_watch_shadow_evictions_total").increment(count as u64);
}
