//! Tracing Initialization
//!
//! Installs a `tracing-subscriber` fmt layer filtered by `RUST_LOG`.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default adds `order_watch_adapter=info`)
//! - `LOG_ANSI`: set to "false" to disable colored output (default: true)
//!
//! # Usage
//!
//! ```ignore
//! use order_watch_adapter::infrastructure::telemetry;
//!
//! // Initialize once at host startup
//! telemetry::init();
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive for this crate.
const DEFAULT_DIRECTIVE: &str = "order_watch_adapter=info";

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directive added on top of `RUST_LOG`.
    pub default_directive: String,
    /// Whether to emit ANSI colors.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_DIRECTIVE.to_string(),
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let ansi = std::env::var("LOG_ANSI")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            ansi,
            ..Self::default()
        }
    }
}

/// Initialize tracing with configuration from the environment.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    init_with_config(&TelemetryConfig::from_env())
}

/// Initialize tracing with custom configuration.
///
/// Returns `false` if a global subscriber was already installed, which leaves
/// the host's subscriber in place.
pub fn init_with_config(config: &TelemetryConfig) -> bool {
    let mut env_filter = EnvFilter::from_default_env();
    match config.default_directive.parse() {
        Ok(directive) => env_filter = env_filter.add_directive(directive),
        Err(e) => eprintln!(
            "Ignoring invalid log directive {:?}: {e}",
            config.default_directive
        ),
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(config.ansi)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

// =============================================================================
// Tests
// =============================================================================
