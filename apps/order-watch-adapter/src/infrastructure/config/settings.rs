//! Adapter Configuration Settings
//!
//! Configuration types for both backends, loaded from environment variables.
//! Unset or unparsable variables fall back to their defaults; `validate`
//! rejects values the adapters cannot run with.

use std::time::Duration;

/// Default Mesh node endpoint.
pub const DEFAULT_MESH_ENDPOINT: &str = "ws://localhost:60557";

/// Zero address used as the taker when simulating fills.
pub const NULL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Remote (Mesh) backend settings.
#[derive(Debug, Clone)]
pub struct MeshSettings {
    /// WebSocket endpoint of the Mesh node.
    pub endpoint: String,
    /// Expected interval between heartbeat notifications.
    pub heartbeat_interval: Duration,
    /// Tolerance on top of the heartbeat interval.
    pub heartbeat_slack: Duration,
    /// Delay between connection attempts.
    pub reconnect_delay: Duration,
    /// Reconnect jitter fraction (0 = fixed delay).
    pub reconnect_jitter: f64,
    /// Handshake and per-request timeout.
    pub request_timeout: Duration,
    /// Capacity of the notification channel.
    pub notification_capacity: usize,
    /// Orders per `mesh_addOrders` request.
    pub submit_batch_size: usize,
    /// Orders per `mesh_getOrders` page.
    pub snapshot_page_size: usize,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_MESH_ENDPOINT.to_string(),
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_slack: Duration::from_secs(1),
            reconnect_delay: Duration::from_secs(1),
            reconnect_jitter: 0.0,
            request_timeout: Duration::from_secs(30),
            notification_capacity: 1024,
            submit_batch_size: 1000,
            snapshot_page_size: 1000,
        }
    }
}

/// Local (shadow-tracking) backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowSettings {
    /// How long an order may stay shadowed before it is evicted.
    pub shadowing_margin: Duration,
    /// Interval between eviction sweeps.
    pub cleanup_interval: Duration,
    /// Taker address used for fillability simulation.
    pub simulation_taker_address: String,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            shadowing_margin: Duration::from_millis(100_000),
            cleanup_interval: Duration::from_millis(10_000),
            simulation_taker_address: NULL_ADDRESS.to_string(),
        }
    }
}

/// Complete adapter configuration.
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Remote backend settings.
    pub mesh: MeshSettings,
    /// Local backend settings.
    pub shadow: ShadowSettings,
}

impl AdapterConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value fails validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mesh_defaults = MeshSettings::default();
        let mesh = MeshSettings {
            endpoint: lookup("MESH_ENDPOINT").unwrap_or(mesh_defaults.endpoint),
            heartbeat_interval: parse_duration_millis(
                &lookup,
                "MESH_HEARTBEAT_INTERVAL_MS",
                mesh_defaults.heartbeat_interval,
            ),
            heartbeat_slack: parse_duration_millis(
                &lookup,
                "MESH_HEARTBEAT_SLACK_MS",
                mesh_defaults.heartbeat_slack,
            ),
            reconnect_delay: parse_duration_millis(
                &lookup,
                "MESH_RECONNECT_DELAY_MS",
                mesh_defaults.reconnect_delay,
            ),
            reconnect_jitter: parse_or(
                &lookup,
                "MESH_RECONNECT_JITTER",
                mesh_defaults.reconnect_jitter,
            ),
            request_timeout: parse_duration_secs(
                &lookup,
                "MESH_REQUEST_TIMEOUT_SECS",
                mesh_defaults.request_timeout,
            ),
            notification_capacity: parse_or(
                &lookup,
                "MESH_NOTIFICATION_CAPACITY",
                mesh_defaults.notification_capacity,
            ),
            submit_batch_size: parse_or(
                &lookup,
                "MESH_SUBMIT_BATCH_SIZE",
                mesh_defaults.submit_batch_size,
            ),
            snapshot_page_size: parse_or(
                &lookup,
                "MESH_SNAPSHOT_PAGE_SIZE",
                mesh_defaults.snapshot_page_size,
            ),
        };

        let shadow_defaults = ShadowSettings::default();
        let shadow = ShadowSettings {
            shadowing_margin: parse_duration_millis(
                &lookup,
                "ORDER_SHADOWING_MARGIN_MS",
                shadow_defaults.shadowing_margin,
            ),
            cleanup_interval: parse_duration_millis(
                &lookup,
                "PERMANENT_CLEANUP_INTERVAL_MS",
                shadow_defaults.cleanup_interval,
            ),
            simulation_taker_address: lookup("DEFAULT_TAKER_SIMULATION_ADDRESS")
                .unwrap_or(shadow_defaults.simulation_taker_address),
        };

        let config = Self { mesh, shadow };
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mesh = &self.mesh;

        if mesh.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyValue("MESH_ENDPOINT".to_string()));
        }
        if !(mesh.endpoint.starts_with("ws://") || mesh.endpoint.starts_with("wss://")) {
            return Err(invalid("MESH_ENDPOINT", "must be a ws:// or wss:// URL"));
        }
        if mesh.heartbeat_interval.is_zero() {
            return Err(invalid("MESH_HEARTBEAT_INTERVAL_MS", "must be positive"));
        }
        if mesh.request_timeout.is_zero() {
            return Err(invalid("MESH_REQUEST_TIMEOUT_SECS", "must be positive"));
        }
        if !(0.0..1.0).contains(&mesh.reconnect_jitter) {
            return Err(invalid("MESH_RECONNECT_JITTER", "must be in [0, 1)"));
        }
        if mesh.notification_capacity == 0 {
            return Err(invalid("MESH_NOTIFICATION_CAPACITY", "must be positive"));
        }
        if mesh.submit_batch_size == 0 {
            return Err(invalid("MESH_SUBMIT_BATCH_SIZE", "must be positive"));
        }
        if mesh.snapshot_page_size == 0 {
            return Err(invalid("MESH_SNAPSHOT_PAGE_SIZE", "must be positive"));
        }

        let shadow = &self.shadow;
        if shadow.cleanup_interval.is_zero() {
            return Err(invalid("PERMANENT_CLEANUP_INTERVAL_MS", "must be positive"));
        }
        if shadow.simulation_taker_address.trim().is_empty() {
            return Err(ConfigError::EmptyValue(
                "DEFAULT_TAKER_SIMULATION_ADDRESS".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has an unusable value.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn mesh_settings_defaults() {
        let settings = MeshSettings::default();
        assert_eq!(settings.endpoint, "ws://localhost:60557");
        assert_eq!(settings.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(settings.heartbeat_slack, Duration::from_secs(1));
        assert_eq!(settings.reconnect_delay, Duration::from_secs(1));
        assert!(settings.reconnect_jitter.abs() < f64::EPSILON);
        assert_eq!(settings.submit_batch_size, 1000);
        assert_eq!(settings.snapshot_page_size, 1000);
    }

    #[test]
    fn shadow_settings_defaults() {
        let settings = ShadowSettings::default();
        assert_eq!(settings.shadowing_margin, Duration::from_secs(100));
        assert_eq!(settings.cleanup_interval, Duration::from_secs(10));
        assert_eq!(settings.simulation_taker_address, NULL_ADDRESS);
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = AdapterConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.mesh.endpoint, DEFAULT_MESH_ENDPOINT);
        assert_eq!(config.shadow, ShadowSettings::default());
    }

    #[test]
    fn environment_overrides() {
        let config = AdapterConfig::from_lookup(lookup_from(&[
            ("MESH_ENDPOINT", "wss://mesh.example.org:443"),
            ("MESH_HEARTBEAT_INTERVAL_MS", "2000"),
            ("MESH_RECONNECT_JITTER", "0.2"),
            ("MESH_SUBMIT_BATCH_SIZE", "250"),
            ("ORDER_SHADOWING_MARGIN_MS", "5000"),
            ("DEFAULT_TAKER_SIMULATION_ADDRESS", "0x1111111111111111111111111111111111111111"),
        ]))
        .unwrap();

        assert_eq!(config.mesh.endpoint, "wss://mesh.example.org:443");
        assert_eq!(config.mesh.heartbeat_interval, Duration::from_secs(2));
        assert!((config.mesh.reconnect_jitter - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.mesh.submit_batch_size, 250);
        assert_eq!(config.shadow.shadowing_margin, Duration::from_secs(5));
        assert_eq!(
            config.shadow.simulation_taker_address,
            "0x1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let config = AdapterConfig::from_lookup(lookup_from(&[
            ("MESH_SNAPSHOT_PAGE_SIZE", "lots"),
            ("PERMANENT_CLEANUP_INTERVAL_MS", "-5"),
        ]))
        .unwrap();
        assert_eq!(config.mesh.snapshot_page_size, 1000);
        assert_eq!(config.shadow.cleanup_interval, Duration::from_secs(10));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = AdapterConfig::from_lookup(lookup_from(&[("MESH_SUBMIT_BATCH_SIZE", "0")]))
            .unwrap_err();
        assert_eq!(err, invalid("MESH_SUBMIT_BATCH_SIZE", "must be positive"));
    }

    #[test]
    fn rejects_non_websocket_endpoint() {
        let err = AdapterConfig::from_lookup(lookup_from(&[("MESH_ENDPOINT", "http://localhost")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "MESH_ENDPOINT"));
    }

    #[test]
    fn rejects_empty_endpoint() {
        let err = AdapterConfig::from_lookup(lookup_from(&[("MESH_ENDPOINT", " ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyValue("MESH_ENDPOINT".to_string()));
    }

    #[test]
    fn rejects_out_of_range_jitter() {
        let err = AdapterConfig::from_lookup(lookup_from(&[("MESH_RECONNECT_JITTER", "1.5")]))
            .unwrap_err();
        assert!(err.to_string().contains("MESH_RECONNECT_JITTER"));
    }
}
