//! Heartbeat Watchdog
//!
//! Tracks Mesh heartbeat notifications and decides when the session is dead.
//! Mesh ticks the `heartbeat` channel roughly every five seconds; the
//! watchdog checks once per period (interval plus slack) and expires the
//! session when no tick arrived within that period.
//!
//! The watchdog is plain state owned by the connection task. Its ticker is a
//! `select!` arm in that task, so there is exactly one writer.

use std::time::{Duration, Instant};

/// Shortest watchdog period; a zero period cannot drive a ticker.
const MIN_WATCHDOG_PERIOD: Duration = Duration::from_millis(1);

/// Configuration for heartbeat liveness.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Expected interval between heartbeat notifications.
    pub interval: Duration,
    /// Extra tolerance on top of the interval.
    pub slack: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            slack: Duration::from_secs(1),
        }
    }
}

impl HeartbeatConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(interval: Duration, slack: Duration) -> Self {
        Self { interval, slack }
    }

    /// Create configuration from `MeshSettings`.
    #[must_use]
    pub const fn from_mesh_settings(settings: &crate::MeshSettings) -> Self {
        Self {
            interval: settings.heartbeat_interval,
            slack: settings.heartbeat_slack,
        }
    }

    /// Watchdog period: the heartbeat interval plus slack, at least 1ms.
    #[must_use]
    pub fn watchdog_period(&self) -> Duration {
        self.interval
            .saturating_add(self.slack)
            .max(MIN_WATCHDOG_PERIOD)
    }
}

/// Liveness state of one connected session.
#[derive(Debug)]
pub struct HeartbeatWatchdog {
    period: Duration,
    last_heartbeat: Option<Instant>,
}

impl HeartbeatWatchdog {
    /// Create a watchdog with no heartbeat recorded.
    #[must_use]
    pub fn new(config: &HeartbeatConfig) -> Self {
        Self {
            period: config.watchdog_period(),
            last_heartbeat: None,
        }
    }

    /// Watchdog period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Record a heartbeat. Also used to arm the watchdog on connect.
    pub const fn record_heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = Some(now);
    }

    /// Time since the last heartbeat, if one was recorded.
    #[must_use]
    pub fn time_since_heartbeat(&self, now: Instant) -> Option<Duration> {
        self.last_heartbeat
            .map(|last| now.saturating_duration_since(last))
    }

    /// Whether the session should be declared dead.
    ///
    /// An unarmed watchdog counts as expired.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.time_since_heartbeat(now)
            .is_none_or(|elapsed| elapsed > self.period)
    }

    /// Forget the last heartbeat.
    pub const fn clear(&mut self) {
        self.last_heartbeat = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = HeartbeatConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.slack, Duration::from_secs(1));
        assert_eq!(config.watchdog_period(), Duration::from_secs(6));
    }

    #[test]
    fn zero_config_still_has_a_period() {
        let config = HeartbeatConfig::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(config.watchdog_period(), Duration::from_millis(1));
        assert_eq!(HeartbeatWatchdog::new(&config).period(), Duration::from_millis(1));
    }

    #[test]
    fn unarmed_watchdog_is_expired() {
        let watchdog = HeartbeatWatchdog::new(&HeartbeatConfig::default());
        assert!(watchdog.is_expired(Instant::now()));
        assert!(watchdog.time_since_heartbeat(Instant::now()).is_none());
    }

    #[test]
    fn heartbeat_within_period_keeps_alive() {
        let mut watchdog = HeartbeatWatchdog::new(&HeartbeatConfig::default());
        let start = Instant::now();
        watchdog.record_heartbeat(start);

        assert!(!watchdog.is_expired(start + Duration::from_secs(5)));
        assert!(!watchdog.is_expired(start + Duration::from_secs(6)));
    }

    #[test]
    fn heartbeat_absence_beyond_period_expires() {
        let mut watchdog = HeartbeatWatchdog::new(&HeartbeatConfig::default());
        let start = Instant::now();
        watchdog.record_heartbeat(start);

        assert!(watchdog.is_expired(start + Duration::from_millis(6001)));
    }

    #[test]
    fn later_heartbeat_extends_liveness() {
        let mut watchdog = HeartbeatWatchdog::new(&HeartbeatConfig::default());
        let start = Instant::now();
        watchdog.record_heartbeat(start);
        watchdog.record_heartbeat(start + Duration::from_secs(5));

        assert!(!watchdog.is_expired(start + Duration::from_secs(10)));
    }

    #[test]
    fn clear_disarms() {
        let mut watchdog = HeartbeatWatchdog::new(&HeartbeatConfig::default());
        let now = Instant::now();
        watchdog.record_heartbeat(now);
        watchdog.clear();

        assert!(watchdog.is_expired(now));
    }
}
