//! Validation Results
//!
//! Per-order outcome of an `add_orders` call. Validation failures are data,
//! never errors: every submitted order ends up in exactly one of the two lists.

use std::fmt;

use super::order::SignedOrder;

/// Source classification of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    /// Order failed 0x validation on the relay node.
    ZeroexValidation,
    /// The relay node hit an internal error.
    MeshError,
    /// The relay node rejected the order by its own policy.
    MeshValidation,
    /// Local fillability simulation failed.
    LocalValidation,
    /// The local order watcher refused the order.
    LocalWatcher,
}

impl RejectionKind {
    /// Get the wire/display tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ZeroexValidation => "ZEROEX_VALIDATION",
            Self::MeshError => "MESH_ERROR",
            Self::MeshValidation => "MESH_VALIDATION",
            Self::LocalValidation => "LOCAL_VALIDATION",
            Self::LocalWatcher => "LOCAL_WATCHER",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured rejection reason.
///
/// Renders as `"<KIND> <CODE>: <TEXT>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionReason {
    /// Rejection classification.
    pub kind: RejectionKind,
    /// Machine-readable code.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
}

impl RejectionReason {
    /// Create a new reason.
    #[must_use]
    pub fn new(kind: RejectionKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.code, self.message)
    }
}

/// An order that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedOrder {
    /// The accepted order.
    pub order: SignedOrder,
}

/// An order that failed validation, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOrder {
    /// The rejected order.
    pub order: SignedOrder,
    /// Why it was rejected.
    pub reason: RejectionReason,
}

impl RejectedOrder {
    /// Rendered rejection message.
    #[must_use]
    pub fn message(&self) -> String {
        self.reason.to_string()
    }
}

/// Accepted/rejected partition of a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResults {
    /// Orders that were accepted, in submission order.
    pub accepted: Vec<AcceptedOrder>,
    /// Orders that were rejected, in submission order.
    pub rejected: Vec<RejectedOrder>,
}

impl ValidationResults {
    /// Create an empty result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Total number of orders covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    /// Whether no orders are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.rejected.is_empty()
    }

    /// Record an accepted order.
    pub fn accept(&mut self, order: SignedOrder) {
        self.accepted.push(AcceptedOrder { order });
    }

    /// Record a rejected order.
    pub fn reject(&mut self, order: SignedOrder, reason: RejectionReason) {
        self.rejected.push(RejectedOrder { order, reason });
    }

    /// Append another result, keeping `self` first.
    pub fn extend(&mut self, other: Self) {
        self.accepted.extend(other.accepted);
        self.rejected.extend(other.rejected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures::order_with_salt;

    #[test]
    fn reason_renders_kind_code_message() {
        let reason = RejectionReason::new(
            RejectionKind::ZeroexValidation,
            "OrderHasInvalidSignature",
            "order signature must be valid",
        );
        assert_eq!(
            reason.to_string(),
            "ZEROEX_VALIDATION OrderHasInvalidSignature: order signature must be valid"
        );
    }

    #[test]
    fn extend_keeps_order_and_counts() {
        let mut first = ValidationResults::new();
        first.accept(order_with_salt(1));
        first.reject(
            order_with_salt(2),
            RejectionReason::new(RejectionKind::MeshError, "InternalError", "boom"),
        );

        let mut second = ValidationResults::new();
        second.accept(order_with_salt(3));

        first.extend(second);

        assert_eq!(first.len(), 3);
        assert_eq!(first.accepted[0].order, order_with_salt(1));
        assert_eq!(first.accepted[1].order, order_with_salt(3));
        assert_eq!(first.rejected[0].message(), "MESH_ERROR InternalError: boom");
    }

    #[test]
    fn new_is_empty() {
        let results = ValidationResults::new();
        assert!(results.is_empty());
        assert_eq!(results.len(), 0);
    }
}
