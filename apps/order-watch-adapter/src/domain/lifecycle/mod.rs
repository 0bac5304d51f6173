//! Lifecycle Batches
//!
//! The unit delivered to the owner: a non-empty list of orders that became
//! tradeable (`Add`) or untradeable (`Remove`).

use std::fmt;

use super::order::SignedOrder;

/// Direction of a lifecycle batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    /// Orders became relevant to the owner.
    Add,
    /// Orders stopped being relevant to the owner.
    Remove,
}

impl LifecycleKind {
    /// Get the kind name used in logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-empty, ordered batch of orders tagged with one lifecycle kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleBatch {
    kind: LifecycleKind,
    orders: Vec<SignedOrder>,
}

impl LifecycleBatch {
    /// Create a batch, or `None` when `orders` is empty.
    #[must_use]
    pub fn new(kind: LifecycleKind, orders: Vec<SignedOrder>) -> Option<Self> {
        if orders.is_empty() {
            None
        } else {
            Some(Self { kind, orders })
        }
    }

    /// Batch holding a single added order.
    #[must_use]
    pub fn add(order: SignedOrder) -> Self {
        Self {
            kind: LifecycleKind::Add,
            orders: vec![order],
        }
    }

    /// Batch holding a single removed order.
    #[must_use]
    pub fn remove(order: SignedOrder) -> Self {
        Self {
            kind: LifecycleKind::Remove,
            orders: vec![order],
        }
    }

    /// Lifecycle kind of every order in the batch.
    #[must_use]
    pub const fn kind(&self) -> LifecycleKind {
        self.kind
    }

    /// Orders in delivery order.
    #[must_use]
    pub fn orders(&self) -> &[SignedOrder] {
        &self.orders
    }

    /// Number of orders, always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Consume the batch and return its orders.
    #[must_use]
    pub fn into_orders(self) -> Vec<SignedOrder> {
        self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures::order_with_salt;

    #[test]
    fn empty_batch_is_rejected() {
        assert!(LifecycleBatch::new(LifecycleKind::Add, vec![]).is_none());
    }

    #[test]
    fn batch_preserves_order() {
        let batch = LifecycleBatch::new(
            LifecycleKind::Remove,
            vec![order_with_salt(2), order_with_salt(1)],
        )
        .unwrap();

        assert_eq!(batch.kind(), LifecycleKind::Remove);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert_eq!(batch.orders()[0], order_with_salt(2));
        assert_eq!(batch.into_orders()[1], order_with_salt(1));
    }

    #[test]
    fn singleton_constructors() {
        assert_eq!(LifecycleBatch::add(order_with_salt(1)).kind(), LifecycleKind::Add);
        assert_eq!(
            LifecycleBatch::remove(order_with_salt(1)).kind(),
            LifecycleKind::Remove
        );
    }
}
