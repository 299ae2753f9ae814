// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Portal - real-time sync core.
//!
//! This is the binary entry point. `serve` runs the job inspection gateway,
//! `connect` runs a client sync session, `config` validates and prints the
//! effective configuration.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod connect;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use portal_config::PortalConfig;

/// Portal - real-time sync core.
#[derive(Parser, Debug)]
#[command(name = "portal", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the job gateway and the retention sweeper.
    Serve,
    /// Open a sync session and log its events until interrupted.
    Connect {
        /// Bearer token presented during the handshake.
        #[arg(long, env = "PORTAL_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Validate the configuration and print the effective values.
    Config {
        /// Only validate; print nothing on success.
        #[arg(long)]
        check: bool,
    },
}

fn load_config(path: Option<&std::path::Path>) -> PortalConfig {
    let loaded = match path {
        Some(path) => portal_config::load_and_validate_path(path),
        None => portal_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            portal_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Renders the effective configuration as TOML with secrets masked.
fn render_config(config: &PortalConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.gateway.bearer_token.is_some() {
        shown.gateway.bearer_token = Some("[redacted]".to_string());
    }
    toml::to_string_pretty(&shown)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Connect { token }) => connect::run_connect(config, token.into()).await,
        Some(Commands::Config { check }) => {
            if check {
                eprintln!("portal: configuration is valid");
            } else {
                match render_config(&config) {
                    Ok(rendered) => print!("{rendered}"),
                    Err(e) => {
                        eprintln!("portal: failed to render config: {e}");
                        std::process::exit(1);
                    }
                }
            }
            Ok(())
        }
        None => {
            println!("portal: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("portal: {e}");
        std::process::exit(1);
    }
}
