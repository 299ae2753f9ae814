// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection manager: connect, authenticate, dispatch, reconnect.
//!
//! One task owns the transport for the lifetime of a session:
//!
//! ```text
//! disconnected -> connecting -> connected-unauthenticated -> connected-authenticated
//!       ^                                                            |
//!       +----------------- transport drop / timeout -----------------+
//! ```
//!
//! Every successful connect sends `auth:init` followed immediately by
//! `presence:ping`. An `auth:error` tears the connection down for good. Drops
//! and timeouts reconnect with bounded exponential backoff; once the attempt
//! budget is spent the session is degraded and waits for teardown.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use portal_config::model::ConnectionConfig;
use portal_core::{
    ClientEvent, ConnectionState, Notification, PortalApi, PortalError, RealtimeTransport,
    ServerEvent,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::notifications::ToastDedup;
use crate::session::SharedState;

/// Lifecycle notices published to session subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The connection moved to a new state.
    StateChanged(ConnectionState),
    /// The server rejected the token. No reconnect follows.
    AuthRejected { reason: String },
    /// Reconnect attempts are exhausted; presence and notifications are stale.
    Degraded { attempts: u32 },
    /// A pushed notification should be shown as a toast. Sent once per id.
    Toast(Notification),
}

/// Requests sent to the connection task by other session tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Send `presence:ping` over the live connection.
    Probe,
}

/// Bounded exponential backoff between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            base_delay_ms: config.reconnect_delay_ms,
            max_delay_ms: config.max_reconnect_delay_ms,
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = std::cmp::min(
            self.base_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt)),
            self.max_delay_ms,
        );
        Duration::from_millis(delay)
    }

    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

/// How one connection instance ended.
enum Outcome {
    Cancelled,
    AuthRejected(String),
    Dropped {
        authenticated: bool,
        error: PortalError,
    },
}

/// Owns the transport and drives the connection state machine.
pub(crate) struct ConnectionManager {
    pub(crate) transport: Box<dyn RealtimeTransport>,
    pub(crate) api: Arc<dyn PortalApi>,
    pub(crate) token: SecretString,
    pub(crate) config: ConnectionConfig,
    pub(crate) fetch_limit: usize,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) state_tx: watch::Sender<ConnectionState>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    pub(crate) commands: mpsc::Receiver<Command>,
    pub(crate) toasts: ToastDedup,
    pub(crate) cancel: CancellationToken,
}

impl ConnectionManager {
    /// Runs until the session is cancelled or the token is rejected.
    ///
    /// Returns `Err(AuthRejected)` or `Err(ReconnectExhausted)` when the
    /// session ended for one of those reasons. The transport is closed
    /// before returning in every case.
    pub(crate) async fn run(mut self) -> Result<(), PortalError> {
        let policy = ReconnectPolicy::from_config(&self.config);
        let mut attempt: u32 = 0;

        let result = loop {
            if self.cancel.is_cancelled() {
                break Ok(());
            }

            self.set_state(ConnectionState::Connecting);
            match self.connect_and_serve().await {
                Outcome::Cancelled => break Ok(()),
                Outcome::AuthRejected(reason) => {
                    warn!(reason = %reason, "authentication rejected, not reconnecting");
                    self.shared.auth_rejected.store(true, Ordering::SeqCst);
                    self.close_transport().await;
                    self.set_state(ConnectionState::Disconnected);
                    let _ = self.events.send(SessionEvent::AuthRejected {
                        reason: reason.clone(),
                    });
                    // The token is dead; stop the liveness pings that carry it.
                    self.cancel.cancel();
                    return Err(PortalError::AuthRejected { reason });
                }
                Outcome::Dropped {
                    authenticated,
                    error,
                } => {
                    if authenticated {
                        attempt = 0;
                    }
                    self.close_transport().await;
                    self.set_state(ConnectionState::Disconnected);
                    info!(error = %error, "real-time connection lost");
                }
            }

            if policy.is_exhausted(attempt) {
                warn!(attempts = attempt, "reconnect attempts exhausted, session degraded");
                self.shared.degraded.store(true, Ordering::SeqCst);
                let _ = self.events.send(SessionEvent::Degraded { attempts: attempt });
                self.cancel.cancelled().await;
                break Err(PortalError::ReconnectExhausted { attempts: attempt });
            }

            let delay = policy.delay_for(attempt);
            attempt += 1;
            info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "reconnecting"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        };

        self.close_transport().await;
        self.set_state(ConnectionState::Disconnected);
        debug!("connection task stopped");
        result
    }

    /// Connects once and serves the connection until it ends.
    async fn connect_and_serve(&mut self) -> Outcome {
        let connect_timeout = self.config.connect_timeout();
        let connected = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Outcome::Cancelled,
            res = tokio::time::timeout(connect_timeout, self.transport.connect()) => res,
        };
        match connected {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                return Outcome::Dropped {
                    authenticated: false,
                    error,
                };
            }
            Err(_) => {
                return Outcome::Dropped {
                    authenticated: false,
                    error: PortalError::Timeout {
                        duration: connect_timeout,
                    },
                };
            }
        }

        self.set_state(ConnectionState::ConnectedUnauthenticated);

        let auth = ClientEvent::AuthInit {
            token: self.token.expose_secret().to_string(),
        };
        for event in [auth, ClientEvent::PresencePing] {
            if let Err(error) = self.transport.send(event).await {
                return Outcome::Dropped {
                    authenticated: false,
                    error,
                };
            }
        }

        let auth_timeout = self.config.auth_timeout();
        let auth_deadline = tokio::time::sleep(auth_timeout);
        tokio::pin!(auth_deadline);
        let mut authenticated = false;
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return Outcome::Cancelled,

                _ = &mut auth_deadline, if !authenticated => {
                    return Outcome::Dropped {
                        authenticated: false,
                        error: PortalError::Timeout { duration: auth_timeout },
                    };
                }

                cmd = self.commands.recv(), if commands_open => match cmd {
                    Some(Command::Probe) => {
                        if let Err(error) = self.transport.send(ClientEvent::PresencePing).await {
                            return Outcome::Dropped { authenticated, error };
                        }
                    }
                    None => commands_open = false,
                },

                event = self.transport.recv() => match event {
                    Ok(ServerEvent::AuthOk) if !authenticated => {
                        authenticated = true;
                        self.set_state(ConnectionState::ConnectedAuthenticated);
                        if !self.refresh_notifications().await {
                            return Outcome::Cancelled;
                        }
                    }
                    Ok(ServerEvent::AuthOk) => debug!("ignoring repeated auth:ok"),
                    Ok(ServerEvent::AuthError { message }) => {
                        return Outcome::AuthRejected(message);
                    }
                    Ok(event) => self.dispatch(event).await,
                    Err(error) => return Outcome::Dropped { authenticated, error },
                },
            }
        }
    }

    /// Routes a server event to the presence or notification state.
    async fn dispatch(&mut self, event: ServerEvent) {
        let now = Utc::now();
        match event {
            ServerEvent::PresenceUpdate { user_id, state } => {
                debug!(user = %user_id, state = %state, "presence update");
                self.shared
                    .presence
                    .write()
                    .await
                    .apply_update(user_id, state, now);
            }
            ServerEvent::PresenceSnapshot { users } => {
                debug!(count = users.len(), "presence snapshot");
                self.shared
                    .presence
                    .write()
                    .await
                    .apply_snapshot(&users, now);
            }
            ServerEvent::NotificationNew(notification) => {
                let id = notification.id;
                let inserted = self
                    .shared
                    .notifications
                    .write()
                    .await
                    .push_new(notification.clone());
                debug!(id = %id, inserted, "notification received");
                if self.toasts.should_toast(id) {
                    let _ = self.events.send(SessionEvent::Toast(notification));
                }
            }
            other @ (ServerEvent::AuthOk | ServerEvent::AuthError { .. }) => {
                debug!(event = other.name(), "handshake event outside the handshake");
            }
        }
    }

    /// Bulk fetch after authentication. Failures leave the buffer as it was.
    ///
    /// Returns `false` if the session was cancelled while the request was
    /// in flight.
    async fn refresh_notifications(&self) -> bool {
        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            res = self.api.fetch_notifications(self.fetch_limit) => res,
        };
        match fetched {
            Ok(fetched) => {
                debug!(count = fetched.len(), "notifications fetched");
                self.shared.notifications.write().await.replace_all(fetched);
            }
            Err(e) => debug!(error = %e, "notification bulk fetch failed"),
        }
        true
    }

    async fn close_transport(&mut self) {
        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "transport close failed");
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            debug!(state = %next, "connection state changed");
            let _ = self.events.send(SessionEvent::StateChanged(next));
        }
    }
}
