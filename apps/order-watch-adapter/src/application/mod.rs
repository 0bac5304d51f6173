//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the owner-facing adapter contract, the collaborator
//! ports of the local backend and the local backend itself.

/// Port interfaces for the owner and local collaborators.
pub mod ports;

/// Local order watcher adapter.
pub mod services;
