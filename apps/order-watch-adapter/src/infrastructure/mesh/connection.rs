//! Mesh Connection Manager
//!
//! Supervises the connection to a Mesh node as an explicit state machine:
//!
//! ```text
//! Disconnected ──connect+subscribe──▶ Connecting ──ok──▶ Connected
//!      ▲                                  │                  │
//!      └───────── fixed delay ◀── error ──┘                  │
//!      └──────────── heartbeat timeout / transport close ────┘ (immediate)
//! ```
//!
//! The manager task is the only writer of the connection state, the
//! heartbeat watchdog and the notification stream. Other tasks observe the
//! state through a [`SessionWatch`] and borrow the current session from it.
//!
//! Every transition to Connected starts a fresh snapshot run. The run is
//! cancelled when the session ends.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::codec::decode_order;
use super::heartbeat::{HeartbeatConfig, HeartbeatWatchdog};
use super::messages::WireOrderEvent;
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::session::{
    MeshChannel, MeshConnection, MeshConnector, MeshError, MeshNotification, MeshSession,
};
use super::snapshot::fetch_snapshot;
use crate::MeshSettings;
use crate::application::ports::LifecycleSink;
use crate::domain::events::{ClassifiedEvents, OrderEventKind};
use crate::error::AdapterError;
use crate::infrastructure::metrics::{
    record_connection_state, record_heartbeat_timeout, record_lifecycle_batch,
    record_reconnect_attempt,
};

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of a remote adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Opening the transport and subscribing.
    Connecting,
    /// Subscribed and receiving heartbeats.
    Connected,
}

impl ConnectionState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published link: the state plus the live session while connected.
#[derive(Clone, Default)]
enum Link {
    #[default]
    Disconnected,
    Connecting,
    Connected(Arc<dyn MeshSession>),
}

impl Link {
    const fn state(&self) -> ConnectionState {
        match self {
            Self::Disconnected => ConnectionState::Disconnected,
            Self::Connecting => ConnectionState::Connecting,
            Self::Connected(_) => ConnectionState::Connected,
        }
    }

    fn session(&self) -> Option<Arc<dyn MeshSession>> {
        match self {
            Self::Connected(session) => Some(Arc::clone(session)),
            Self::Disconnected | Self::Connecting => None,
        }
    }
}

/// Read side of the connection state.
#[derive(Clone)]
pub struct SessionWatch {
    rx: watch::Receiver<Link>,
}

impl SessionWatch {
    /// A watch permanently connected to `session`.
    #[cfg(test)]
    pub(crate) fn connected(session: Arc<dyn MeshSession>) -> Self {
        let (_link_tx, rx) = watch::channel(Link::Connected(session));
        Self { rx }
    }

    /// A watch connected to `session` until the returned closure stops it.
    #[cfg(test)]
    pub(crate) fn connected_until_stopped(
        session: Arc<dyn MeshSession>,
    ) -> (Self, impl FnOnce() + Send + 'static) {
        let (link_tx, rx) = watch::channel(Link::Connected(session));
        let stop = move || {
            let _ = link_tx.send(Link::Disconnected);
        };
        (Self { rx }, stop)
    }

    /// A watch whose manager has already stopped.
    #[cfg(test)]
    pub(crate) fn disconnected() -> Self {
        let (_link_tx, rx) = watch::channel(Link::Disconnected);
        Self { rx }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.rx.borrow().state()
    }

    /// Wait until the manager publishes a connected session.
    ///
    /// Returns immediately when already connected.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::ShutDown` once the manager has stopped.
    pub async fn wait_for_session(&self) -> Result<Arc<dyn MeshSession>, AdapterError> {
        let mut rx = self.rx.clone();
        loop {
            let session = rx.borrow_and_update().session();
            if let Some(session) = session {
                return Ok(session);
            }
            if rx.changed().await.is_err() {
                return Err(AdapterError::ShutDown);
            }
        }
    }

    /// Wait until the manager publishes `state`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::ShutDown` once the manager has stopped.
    pub async fn wait_for_state(&self, state: ConnectionState) -> Result<(), AdapterError> {
        let mut rx = self.rx.clone();
        rx.wait_for(|link| link.state() == state)
            .await
            .map(|_| ())
            .map_err(|_| AdapterError::ShutDown)
    }
}

impl fmt::Debug for SessionWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionWatch")
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Why a connected session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    HeartbeatTimeout,
    TransportClosed,
    Shutdown,
}

/// Supervisory task keeping one Mesh session alive.
pub struct ConnectionManager {
    connector: Arc<dyn MeshConnector>,
    sink: Arc<dyn LifecycleSink>,
    heartbeat: HeartbeatConfig,
    reconnect: ReconnectPolicy,
    snapshot_page_size: usize,
    link_tx: watch::Sender<Link>,
    cancel: CancellationToken,
}

impl ConnectionManager {
    /// Create a manager and the watch its state is published on.
    #[must_use]
    pub fn new(
        settings: &MeshSettings,
        connector: Arc<dyn MeshConnector>,
        sink: Arc<dyn LifecycleSink>,
        cancel: CancellationToken,
    ) -> (Self, SessionWatch) {
        let (link_tx, rx) = watch::channel(Link::Disconnected);
        let manager = Self {
            connector,
            sink,
            heartbeat: HeartbeatConfig::from_mesh_settings(settings),
            reconnect: ReconnectPolicy::new(ReconnectConfig::from_mesh_settings(settings)),
            snapshot_page_size: settings.snapshot_page_size,
            link_tx,
            cancel,
        };
        (manager, SessionWatch { rx })
    }

    /// Run until cancelled.
    pub async fn run(mut self) {
        tracing::info!("Mesh connection manager started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.publish(Link::Connecting);

            let established = tokio::select! {
                () = self.cancel.cancelled() => break,
                result = self.establish() => result,
            };

            match established {
                Ok(connection) => {
                    if self.reconnect.attempt_count() > 0 {
                        tracing::info!(
                            attempts = self.reconnect.attempt_count(),
                            "Reconnected to Mesh"
                        );
                    }
                    self.reconnect.reset();

                    match self.serve(connection).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::HeartbeatTimeout | SessionEnd::TransportClosed => {
                            record_reconnect_attempt();
                        }
                    }
                }
                Err(e) => {
                    self.publish(Link::Disconnected);
                    let delay = self.reconnect.next_delay();
                    tracing::warn!(
                        error = %e,
                        attempt = self.reconnect.attempt_count(),
                        delay_ms = duration_millis(delay),
                        "Mesh connection failed, retrying"
                    );
                    record_reconnect_attempt();

                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        self.publish(Link::Disconnected);
        tracing::info!("Mesh connection manager stopped");
    }

    /// Open the transport and subscribe to both channels.
    async fn establish(&self) -> Result<MeshConnection, MeshError> {
        let connection = self.connector.connect().await?;

        let subscribed = async {
            connection.session.subscribe(MeshChannel::Heartbeat).await?;
            connection.session.subscribe(MeshChannel::Orders).await
        }
        .await;

        if let Err(e) = subscribed {
            connection.session.close().await;
            return Err(e);
        }

        Ok(connection)
    }

    /// Drive one connected session until it ends.
    async fn serve(&self, connection: MeshConnection) -> SessionEnd {
        let MeshConnection {
            session,
            mut notifications,
        } = connection;

        let mut watchdog = HeartbeatWatchdog::new(&self.heartbeat);
        watchdog.record_heartbeat(Instant::now().into_std());

        let period = watchdog.period();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.publish(Link::Connected(Arc::clone(&session)));
        tracing::info!("Connected to Mesh");

        let snapshot_cancel = self.cancel.child_token();
        self.spawn_snapshot(Arc::clone(&session), snapshot_cancel.clone());

        let end = loop {
            tokio::select! {
                () = self.cancel.cancelled() => break SessionEnd::Shutdown,
                _ = ticker.tick() => {
                    if watchdog.is_expired(Instant::now().into_std()) {
                        tracing::warn!(
                            period_ms = duration_millis(period),
                            "No Mesh heartbeat within watchdog period, disconnected"
                        );
                        record_heartbeat_timeout();
                        break SessionEnd::HeartbeatTimeout;
                    }
                }
                notification = notifications.recv() => match notification {
                    Some(MeshNotification::Heartbeat) => {
                        watchdog.record_heartbeat(Instant::now().into_std());
                    }
                    Some(MeshNotification::OrderEvents(events)) => self.deliver_events(events),
                    None => {
                        tracing::warn!("Mesh connection closed, disconnected");
                        break SessionEnd::TransportClosed;
                    }
                },
            }
        };

        snapshot_cancel.cancel();
        watchdog.clear();
        session.close().await;
        self.publish(Link::Disconnected);

        end
    }

    fn spawn_snapshot(&self, session: Arc<dyn MeshSession>, cancel: CancellationToken) {
        let sink = Arc::clone(&self.sink);
        let page_size = self.snapshot_page_size;

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("Snapshot fetch cancelled");
                }
                result = fetch_snapshot(session.as_ref(), page_size, sink.as_ref()) => match result {
                    Ok(orders) => tracing::info!(orders, "Mesh snapshot fetched"),
                    Err(e) => tracing::warn!(error = %e, "Mesh snapshot fetch failed"),
                },
            }
        });
    }

    /// Classify one order-events notification and deliver its batches inline.
    fn deliver_events(&self, events: Vec<WireOrderEvent>) {
        let decoded = events.into_iter().filter_map(|event| {
            let kind = match event.kind.parse::<OrderEventKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::warn!(error = %e, order_hash = %event.order_hash, "Skipping order event");
                    return None;
                }
            };
            if kind.lifecycle_action().is_none() {
                return None;
            }

            match decode_order(&event.signed_order) {
                Ok(order) => Some((kind, order)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        order_hash = %event.order_hash,
                        %kind,
                        "Skipping undecodable order event"
                    );
                    None
                }
            }
        });

        for batch in ClassifiedEvents::classify(decoded).into_batches() {
            tracing::debug!(kind = %batch.kind(), orders = batch.len(), "Delivering order events");
            record_lifecycle_batch(batch.kind(), batch.len());
            self.sink.on_lifecycle_event(batch);
        }
    }

    fn publish(&self, link: Link) {
        let state = link.state();
        let previous = self.link_tx.send_replace(link).state();
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Mesh connection state changed");
            record_connection_state(state);
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("heartbeat", &self.heartbeat)
            .field("reconnect", &self.reconnect)
            .field("snapshot_page_size", &self.snapshot_page_size)
            .finish_non_exhaustive()
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
