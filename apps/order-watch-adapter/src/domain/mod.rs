//! Domain Layer - Core order lifecycle types and rules.
//!
//! This layer contains the order model, lifecycle batches, validation
//! results, event classification and shadow tracking. Nothing here performs
//! I/O or owns a task.

/// Order event kinds and their lifecycle classification.
pub mod events;

/// Owner-facing Add/Remove batches.
pub mod lifecycle;

/// Signed orders and order hashes.
pub mod order;

/// Shadowed (provisionally invalid) order tracking.
pub mod shadow;

/// Accepted/rejected submission outcomes.
pub mod validation;
