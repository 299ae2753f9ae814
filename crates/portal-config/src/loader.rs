// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./portal.toml` > `~/.config/portal/portal.toml` > `/etc/portal/portal.toml`
//! with environment variable overrides via `PORTAL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PortalConfig;

/// Top-level sections that accept `PORTAL_<SECTION>_<KEY>` overrides.
const ENV_SECTIONS: &[&str] = &[
    "logging",
    "server",
    "connection",
    "heartbeat",
    "notifications",
    "jobs",
    "gateway",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/portal/portal.toml` (system-wide)
/// 3. `~/.config/portal/portal.toml` (user XDG config)
/// 4. `./portal.toml` (local directory)
/// 5. `PORTAL_*` environment variables
pub fn load_config() -> Result<PortalConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<PortalConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PortalConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PortalConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading config from explicit path");
    Figment::new()
        .merge(Serialized::defaults(PortalConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    config_file_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(PortalConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// The config files consulted by [`load_config`], lowest precedence first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/portal/portal.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("portal/portal.toml"));
    }
    paths.push(
        std::env::current_dir()
            .map(|d| d.join("portal.toml"))
            .unwrap_or_else(|_| PathBuf::from("portal.toml")),
    );
    paths
}

/// Environment provider mapping `PORTAL_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys themselves
/// contain underscores: `PORTAL_CONNECTION_MAX_RECONNECT_ATTEMPTS` must map to
/// `connection.max_reconnect_attempts`. Variables outside the known sections
/// (such as `PORTAL_TOKEN`, read by the CLI) are ignored.
fn env_provider() -> Env {
    Env::prefixed("PORTAL_")
        .filter(|key| section_key(key.as_str()).is_some())
        .map(|key| {
            section_key(key.as_str())
                .unwrap_or_else(|| key.as_str().to_string())
                .into()
        })
}

/// Maps a lowercased, prefix-stripped env key such as `jobs_retention_secs`
/// to its dotted path, or `None` if it names no known section.
fn section_key(key: &str) -> Option<String> {
    ENV_SECTIONS.iter().find_map(|section| {
        key.strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
            .map(|rest| format!("{section}.{rest}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_key_mapping() {
        assert_eq!(
            section_key("connection_max_reconnect_attempts").as_deref(),
            Some("connection.max_reconnect_attempts")
        );
        assert_eq!(section_key("gateway_port").as_deref(), Some("gateway.port"));
        assert_eq!(section_key("token"), None);
        assert_eq!(section_key("jobs_"), None);
    }

    #[test]
    fn env_overrides_section_keys() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORTAL_CONNECTION_MAX_RECONNECT_ATTEMPTS", "4");
            jail.set_env("PORTAL_HEARTBEAT_INTERVAL_SECS", "20");
            jail.set_env("PORTAL_GATEWAY_BEARER_TOKEN", "tok");
            let config = load_config()?;
            assert_eq!(config.connection.max_reconnect_attempts, 4);
            assert_eq!(config.heartbeat.interval_secs, 20);
            assert_eq!(config.gateway.bearer_token.as_deref(), Some("tok"));
            Ok(())
        });
    }

    #[test]
    fn unrelated_portal_env_vars_are_ignored() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("PORTAL_TOKEN", "session-token");
            let config = load_config()?;
            assert_eq!(config.logging.level, "info");
            Ok(())
        });
    }

    #[test]
    fn local_file_has_highest_file_precedence() {
        let paths = config_file_paths();
        assert_eq!(paths[0], PathBuf::from("/etc/portal/portal.toml"));
        assert!(paths.last().is_some_and(|p| p.ends_with("portal.toml") && p.is_absolute()));
    }

    #[test]
    fn local_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "portal.toml",
                r#"
[notifications]
capacity = 50
"#,
            )?;
            let config = load_config()?;
            assert_eq!(config.notifications.capacity, 50);
            assert_eq!(config.notifications.fetch_limit, 100);
            Ok(())
        });
    }
}
