//! Order Event Classification
//!
//! Maps relay order events onto owner lifecycle decisions.
//!
//! | Event kind | Action |
//! |---|---|
//! | `ADDED`, `FILLABILITY_INCREASED` | Add |
//! | `CANCELLED`, `EXPIRED`, `FULLY_FILLED`, `UNFUNDED` | Remove |
//! | `FILLED`, `INVALID` | ignore |
//!
//! All events of one notification collapse into at most one Add batch and at
//! most one Remove batch.

use std::fmt;
use std::str::FromStr;

use super::lifecycle::{LifecycleBatch, LifecycleKind};
use super::order::SignedOrder;

/// State transition reported for a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEventKind {
    /// Order entered the relay's book.
    Added,
    /// Order was partially filled.
    Filled,
    /// Order was completely filled.
    FullyFilled,
    /// Maker cancelled the order.
    Cancelled,
    /// Order passed its expiration time.
    Expired,
    /// Maker lacks balance or allowance.
    Unfunded,
    /// Maker regained balance or allowance.
    FillabilityIncreased,
    /// Order failed validation.
    Invalid,
}

impl OrderEventKind {
    /// Get the wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Filled => "FILLED",
            Self::FullyFilled => "FULLY_FILLED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
            Self::Unfunded => "UNFUNDED",
            Self::FillabilityIncreased => "FILLABILITY_INCREASED",
            Self::Invalid => "INVALID",
        }
    }

    /// Lifecycle action for this event, `None` when it is ignored.
    #[must_use]
    pub const fn lifecycle_action(&self) -> Option<LifecycleKind> {
        match self {
            Self::Added | Self::FillabilityIncreased => Some(LifecycleKind::Add),
            Self::Cancelled | Self::Expired | Self::FullyFilled | Self::Unfunded => {
                Some(LifecycleKind::Remove)
            }
            Self::Filled | Self::Invalid => None,
        }
    }
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised event tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for OrderEventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADDED" => Ok(Self::Added),
            "FILLED" => Ok(Self::Filled),
            "FULLY_FILLED" => Ok(Self::FullyFilled),
            "CANCELLED" => Ok(Self::Cancelled),
            "EXPIRED" => Ok(Self::Expired),
            "UNFUNDED" => Ok(Self::Unfunded),
            "FILLABILITY_INCREASED" => Ok(Self::FillabilityIncreased),
            "INVALID" => Ok(Self::Invalid),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// Orders of one notification split by lifecycle action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedEvents {
    /// Orders to add, in event order.
    pub added: Vec<SignedOrder>,
    /// Orders to remove, in event order.
    pub removed: Vec<SignedOrder>,
}

impl ClassifiedEvents {
    /// Classify a notification's events.
    pub fn classify<I>(events: I) -> Self
    where
        I: IntoIterator<Item = (OrderEventKind, SignedOrder)>,
    {
        let mut classified = Self::default();
        for (kind, order) in events {
            match kind.lifecycle_action() {
                Some(LifecycleKind::Add) => classified.added.push(order),
                Some(LifecycleKind::Remove) => classified.removed.push(order),
                None => {}
            }
        }
        classified
    }

    /// Non-empty batches to deliver: Add first, then Remove.
    #[must_use]
    pub fn into_batches(self) -> Vec<LifecycleBatch> {
        [
            LifecycleBatch::new(LifecycleKind::Add, self.added),
            LifecycleBatch::new(LifecycleKind::Remove, self.removed),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::order::fixtures::order_with_salt;

    #[test_case(OrderEventKind::Added => Some(LifecycleKind::Add))]
    #[test_case(OrderEventKind::FillabilityIncreased => Some(LifecycleKind::Add))]
    #[test_case(OrderEventKind::Cancelled => Some(LifecycleKind::Remove))]
    #[test_case(OrderEventKind::Expired => Some(LifecycleKind::Remove))]
    #[test_case(OrderEventKind::FullyFilled => Some(LifecycleKind::Remove))]
    #[test_case(OrderEventKind::Unfunded => Some(LifecycleKind::Remove))]
    #[test_case(OrderEventKind::Filled => None)]
    #[test_case(OrderEventKind::Invalid => None)]
    fn lifecycle_action_table(kind: OrderEventKind) -> Option<LifecycleKind> {
        kind.lifecycle_action()
    }

    #[test]
    fn wire_tags_round_trip() {
        for kind in [
            OrderEventKind::Added,
            OrderEventKind::Filled,
            OrderEventKind::FullyFilled,
            OrderEventKind::Cancelled,
            OrderEventKind::Expired,
            OrderEventKind::Unfunded,
            OrderEventKind::FillabilityIncreased,
            OrderEventKind::Invalid,
        ] {
            assert_eq!(kind.as_str().parse::<OrderEventKind>(), Ok(kind));
        }
        assert!("STOPPED_WATCHING".parse::<OrderEventKind>().is_err());
    }

    #[test]
    fn added_and_cancelled_yield_two_singleton_batches() {
        let batches = ClassifiedEvents::classify([
            (OrderEventKind::Added, order_with_salt(1)),
            (OrderEventKind::Cancelled, order_with_salt(2)),
        ])
        .into_batches();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].kind(), LifecycleKind::Add);
        assert_eq!(batches[0].orders(), &[order_with_salt(1)]);
        assert_eq!(batches[1].kind(), LifecycleKind::Remove);
        assert_eq!(batches[1].orders(), &[order_with_salt(2)]);
    }

    #[test]
    fn aggregation_preserves_event_order_per_class() {
        let classified = ClassifiedEvents::classify([
            (OrderEventKind::Expired, order_with_salt(5)),
            (OrderEventKind::Added, order_with_salt(1)),
            (OrderEventKind::Filled, order_with_salt(9)),
            (OrderEventKind::Unfunded, order_with_salt(6)),
            (OrderEventKind::FillabilityIncreased, order_with_salt(2)),
        ]);

        assert_eq!(classified.added, vec![order_with_salt(1), order_with_salt(2)]);
        assert_eq!(classified.removed, vec![order_with_salt(5), order_with_salt(6)]);
    }

    #[test]
    fn ignored_only_yields_no_batches() {
        let batches = ClassifiedEvents::classify([
            (OrderEventKind::Filled, order_with_salt(1)),
            (OrderEventKind::Invalid, order_with_salt(2)),
        ])
        .into_batches();
        assert!(batches.is_empty());
    }
}
