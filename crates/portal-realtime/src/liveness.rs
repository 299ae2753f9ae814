// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Liveness fallback: keeps the user marked present even while the real-time
//! connection is down.
//!
//! Two timers run for the lifetime of a session. The primary heartbeat asks
//! the connection task to send `presence:ping` when a connection exists. The
//! fallback heartbeat calls the out-of-band ping endpoint only when it does
//! not. One out-of-band ping is also sent as soon as the session starts.

use std::sync::Arc;
use std::time::Duration;

use portal_core::{ConnectionState, PortalApi};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::Command;

pub(crate) struct LivenessMonitor {
    pub(crate) api: Arc<dyn PortalApi>,
    pub(crate) state: watch::Receiver<ConnectionState>,
    pub(crate) probes: mpsc::Sender<Command>,
    pub(crate) interval: Duration,
    pub(crate) fallback_interval: Duration,
    pub(crate) cancel: CancellationToken,
}

impl LivenessMonitor {
    pub(crate) async fn run(self) {
        self.ping_out_of_band().await;

        let mut primary = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        primary.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut fallback = tokio::time::interval_at(
            Instant::now() + self.fallback_interval,
            self.fallback_interval,
        );
        fallback.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = primary.tick() => {
                    if self.is_connected() {
                        // A full queue already holds a pending probe.
                        if self.probes.try_send(Command::Probe).is_err() {
                            debug!("heartbeat probe skipped");
                        }
                    }
                }
                _ = fallback.tick() => {
                    if !self.is_connected() {
                        self.ping_out_of_band().await;
                    }
                }
            }
        }
        debug!("liveness timers stopped");
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    async fn ping_out_of_band(&self) {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            res = self.api.ping() => {
                if let Err(e) = res {
                    debug!(error = %e, "out-of-band ping failed");
                }
            }
        }
    }
}
