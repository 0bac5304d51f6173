//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the remote backend and the ambient concerns shared by
//! both backends.

/// Mesh relay node client and remote adapter.
pub mod mesh;

/// Configuration loaded from the environment.
pub mod config;

/// Metrics instrumentation via the `metrics` facade.
pub mod metrics;

/// Tracing subscriber setup.
pub mod telemetry;
