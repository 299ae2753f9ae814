// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `portal serve` command implementation.
//!
//! Builds the shared job registry, starts its retention sweeper, and serves
//! the inspection gateway until SIGINT/SIGTERM.

use std::sync::Arc;

use portal_config::PortalConfig;
use portal_core::PortalError;
use portal_gateway::{GatewayState, ServerConfig};
use portal_jobs::JobRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs the `portal serve` command.
pub async fn run_serve(config: PortalConfig) -> Result<(), PortalError> {
    init_tracing(&config.logging.level);

    let registry = Arc::new(JobRegistry::with_retention(config.jobs.retention()));
    let cancel = install_signal_handler();

    let sweeper = registry.spawn_sweeper(config.jobs.sweep_interval(), cancel.clone());
    info!(
        retention_secs = config.jobs.retention_secs,
        sweep_interval_secs = config.jobs.sweep_interval_secs,
        "job registry initialized"
    );

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };
    let state = GatewayState::new(Arc::clone(&registry), server_config.bearer_token.clone());

    let served = portal_gateway::start_server(&server_config, state, cancel.clone()).await;

    // A bind failure returns before any signal; stop the sweeper either way.
    cancel.cancel();
    if let Err(e) = sweeper.await {
        warn!(error = %e, "job sweeper task ended abnormally");
    }

    served?;
    info!("portal serve shutdown complete");
    Ok(())
}

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] cancelled when either signal arrives.
pub(crate) fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            info!("received SIGINT (Ctrl+C), initiating shutdown");
                        }
                        _ = sigterm.recv() => {
                            info!("received SIGTERM, initiating shutdown");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler; Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Initializes the tracing subscriber with the given log level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portal={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
