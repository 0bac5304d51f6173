//! Configuration Module
//!
//! Environment-driven configuration for the embedding host.

mod settings;

pub use settings::{
    AdapterConfig, ConfigError, DEFAULT_MESH_ENDPOINT, MeshSettings, NULL_ADDRESS, ShadowSettings,
};
