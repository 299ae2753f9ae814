// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `portal connect` command implementation.
//!
//! Opens a sync session against the configured endpoints and logs connection
//! state, presence, and toast events until SIGINT/SIGTERM or an auth rejection.

use portal_config::PortalConfig;
use portal_core::PortalError;
use portal_realtime::{SessionEvent, SyncClient};
use secrecy::SecretString;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::serve::{init_tracing, install_signal_handler};

/// Runs the `portal connect` command.
pub async fn run_connect(config: PortalConfig, token: SecretString) -> Result<(), PortalError> {
    init_tracing(&config.logging.level);

    let cancel = install_signal_handler();
    let mut client = SyncClient::new(config);
    let session = client.connect(token).await?;
    let mut events = session.subscribe();
    info!(ws_url = %client.config().server.ws_url, "sync session started");

    let mut rejected = None;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(SessionEvent::StateChanged(state)) => info!(%state, "connection state changed"),
                Ok(SessionEvent::Toast(n)) => {
                    info!(id = %n.id, kind = %n.kind, message = %n.message, "notification");
                }
                Ok(SessionEvent::Degraded { attempts }) => {
                    warn!(attempts, "reconnect attempts exhausted; presence and notifications are stale");
                }
                Ok(SessionEvent::AuthRejected { reason }) => {
                    rejected = Some(reason);
                    break;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "session event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    if let Some(session) = client.session() {
        info!(
            unread = session.unread_count().await,
            online = session.online_users().await.len(),
            "ending sync session"
        );
    }
    client.end_session().await;

    match rejected {
        Some(reason) => Err(PortalError::AuthRejected { reason }),
        None => Ok(()),
    }
}
