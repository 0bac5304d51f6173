//! Shadow Order Tracking
//!
//! Orders reported invalid by the local watcher are not removed right away.
//! They are *shadowed*: hidden from the owner via the order filter while a
//! grace margin runs. A later valid report clears the shadow; otherwise a
//! sweep evicts the order for good once the margin has elapsed.
//!
//! The margin counts from the first invalid report. Further invalid reports
//! for an already shadowed order do not refresh that instant, so a watcher
//! that keeps re-reporting a dead order cannot hold it back indefinitely.
//! Only a valid report resets it.
//!
//! This type is pure state. Timing is driven by the caller passing `now`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::order::OrderHash;

/// Map of shadowed order hashes to the instant they were first seen invalid.
#[derive(Debug, Default)]
pub struct ShadowOrderTracker {
    shadowed_at: HashMap<OrderHash, Instant>,
}

impl ShadowOrderTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a validity report for an order.
    ///
    /// An invalid report keeps the first-seen instant if one exists, so
    /// repeated invalid reports do not extend the grace margin.
    pub fn record_validity(&mut self, order_hash: &OrderHash, is_valid: bool, now: Instant) {
        if is_valid {
            self.shadowed_at.remove(order_hash);
        } else {
            self.shadowed_at.entry(order_hash.clone()).or_insert(now);
        }
    }

    /// Whether the order is currently shadowed.
    #[must_use]
    pub fn is_shadowed(&self, order_hash: &OrderHash) -> bool {
        self.shadowed_at.contains_key(order_hash)
    }

    /// Drop the shadow entry for an order, returning whether one existed.
    pub fn clear(&mut self, order_hash: &OrderHash) -> bool {
        self.shadowed_at.remove(order_hash).is_some()
    }

    /// Hashes whose shadow is older than `margin` at `now`.
    #[must_use]
    pub fn expired(&self, now: Instant, margin: Duration) -> Vec<OrderHash> {
        self.shadowed_at
            .iter()
            .filter(|(_, shadowed_at)| now.saturating_duration_since(**shadowed_at) > margin)
            .map(|(hash, _)| hash.clone())
            .collect()
    }

    /// Number of shadowed orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shadowed_at.len()
    }

    /// Whether nothing is shadowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shadowed_at.is_empty()
    }
}
