// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration.
//!
//! A session is one authenticated user's connection plus its liveness timers,
//! both spawned under a single [`CancellationToken`]. [`SessionHandle`] is the
//! UI-facing surface: observable state, presence and notification reads, and
//! acknowledge/dismiss commands.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use portal_config::PortalConfig;
use portal_core::{
    ConnectionState, Notification, NotificationId, PluginAdapter, PortalApi, PortalError,
    RealtimeTransport, UserId,
};
use secrecy::SecretString;
use tokio::sync::{RwLock, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionManager, SessionEvent};
use crate::http::HttpPortalApi;
use crate::liveness::LivenessMonitor;
use crate::notifications::{NotificationChannel, ToastDedup};
use crate::presence::{PresenceAggregator, PresenceEntry};
use crate::ws::WsTransport;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const COMMAND_CHANNEL_CAPACITY: usize = 8;

/// State written by the connection task and read by the handle.
#[derive(Debug)]
pub(crate) struct SharedState {
    pub(crate) presence: RwLock<PresenceAggregator>,
    pub(crate) notifications: RwLock<NotificationChannel>,
    pub(crate) degraded: AtomicBool,
    pub(crate) auth_rejected: AtomicBool,
}

/// Entry point for starting a session.
pub struct SyncSession;

impl SyncSession {
    /// Spawns the connection and liveness tasks for `token`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: &PortalConfig,
        token: SecretString,
        transport: Box<dyn RealtimeTransport>,
        api: Arc<dyn PortalApi>,
    ) -> SessionHandle {
        info!(
            ws_url = %config.server.ws_url,
            transport = transport.name(),
            api = api.name(),
            "starting sync session"
        );

        let shared = Arc::new(SharedState {
            presence: RwLock::new(PresenceAggregator::new()),
            notifications: RwLock::new(NotificationChannel::with_capacity(
                config.notifications.capacity,
            )),
            degraded: AtomicBool::new(false),
            auth_rejected: AtomicBool::new(false),
        });
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (probe_tx, probe_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let manager = ConnectionManager {
            transport,
            api: Arc::clone(&api),
            token,
            config: config.connection.clone(),
            fetch_limit: config.notifications.fetch_limit,
            shared: Arc::clone(&shared),
            state_tx,
            events: events.clone(),
            commands: probe_rx,
            toasts: ToastDedup::new(),
            cancel: cancel.clone(),
        };
        let monitor = LivenessMonitor {
            api: Arc::clone(&api),
            state: state_rx.clone(),
            probes: probe_tx,
            interval: config.heartbeat.interval(),
            fallback_interval: config.heartbeat.fallback_interval(),
            cancel: cancel.clone(),
        };

        let connection = tokio::spawn(manager.run());
        let liveness = tokio::spawn(monitor.run());

        SessionHandle {
            shared,
            state: state_rx,
            events,
            api,
            cancel,
            connection: Some(connection),
            liveness: Some(liveness),
        }
    }
}

/// Handle to a running session.
///
/// Dropping the handle cancels the session without waiting; call
/// [`SessionHandle::end`] to wait until the transport is closed.
pub struct SessionHandle {
    shared: Arc<SharedState>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<SessionEvent>,
    api: Arc<dyn PortalApi>,
    cancel: CancellationToken,
    connection: Option<JoinHandle<Result<(), PortalError>>>,
    liveness: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every connection state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Subscribes to session lifecycle notices and toasts.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Reconnect attempts ran out; data may be stale.
    pub fn is_degraded(&self) -> bool {
        self.shared.degraded.load(Ordering::SeqCst)
    }

    /// The server rejected the session token.
    pub fn is_auth_rejected(&self) -> bool {
        self.shared.auth_rejected.load(Ordering::SeqCst)
    }

    pub async fn is_online(&self, user: UserId) -> bool {
        self.shared.presence.read().await.is_online(user)
    }

    pub async fn presence_snapshot(&self) -> HashMap<UserId, PresenceEntry> {
        self.shared.presence.read().await.snapshot()
    }

    pub async fn online_users(&self) -> Vec<UserId> {
        self.shared.presence.read().await.online_users()
    }

    /// Buffered notifications, newest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.shared.notifications.read().await.list()
    }

    pub async fn unread_count(&self) -> usize {
        self.shared.notifications.read().await.unread_count()
    }

    /// Marks `id` read locally and notifies the server in the background.
    ///
    /// The local change is never rolled back, even if the request fails.
    pub async fn acknowledge(&self, id: NotificationId) {
        let changed = self
            .shared
            .notifications
            .write()
            .await
            .acknowledge(id, Utc::now());
        debug!(id = %id, changed, "notification acknowledged");

        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.acknowledge(id).await {
                debug!(id = %id, error = %e, "acknowledge request failed");
            }
        });
    }

    /// Marks every buffered notification read and notifies the server.
    pub async fn acknowledge_all(&self) {
        let changed = self
            .shared
            .notifications
            .write()
            .await
            .acknowledge_all(Utc::now());
        debug!(changed, "all notifications acknowledged");

        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.acknowledge_all().await {
                debug!(error = %e, "acknowledge-all request failed");
            }
        });
    }

    /// Removes a notification from the local buffer only.
    pub async fn dismiss(&self, id: NotificationId) -> bool {
        self.shared.notifications.write().await.dismiss(id)
    }

    /// Ends the session and waits until timers are stopped and the
    /// transport is closed.
    pub async fn end(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.connection.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "session ended after failure"),
                Err(e) => warn!(error = %e, "connection task panicked"),
            }
        }
        if let Some(task) = self.liveness.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "liveness task panicked");
        }
        info!("sync session ended");
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Owns at most one session at a time.
///
/// Starting a session ends the previous one first, so heartbeats and event
/// streams of two sessions never overlap.
pub struct SyncClient {
    config: PortalConfig,
    session: Option<SessionHandle>,
}

impl SyncClient {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Starts a session over the given adapters, ending any previous one.
    pub async fn start_session(
        &mut self,
        token: SecretString,
        transport: Box<dyn RealtimeTransport>,
        api: Arc<dyn PortalApi>,
    ) -> &SessionHandle {
        self.end_session().await;
        let handle = SyncSession::start(&self.config, token, transport, api);
        self.session.insert(handle)
    }

    /// Starts a session against the configured WebSocket and HTTP endpoints.
    pub async fn connect(&mut self, token: SecretString) -> Result<&SessionHandle, PortalError> {
        let transport = WsTransport::new(self.config.server.ws_url.clone());
        let api = HttpPortalApi::new(self.config.server.api_base_url.clone(), token.clone())?;
        Ok(self
            .start_session(token, Box::new(transport), Arc::new(api))
            .await)
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Ends the current session, if any.
    pub async fn end_session(&mut self) {
        if let Some(previous) = self.session.take() {
            previous.end().await;
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }
}
