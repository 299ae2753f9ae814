// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Portal sync core.
//!
//! `portal.toml` is layered over compiled defaults from `/etc`, the XDG config
//! dir and the working directory, then `PORTAL_<SECTION>_<KEY>` variables.
//! Every section rejects unknown keys; the resulting errors are reported
//! against the file and line they came from.
//!
//! # Usage
//!
//! ```no_run
//! use portal_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("ws endpoint: {}", config.server.ws_url);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, render_report, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::PortalConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors become diagnostics pointing into whichever config file
/// holds the bad key; semantic problems are reported after a clean parse.
pub fn load_and_validate() -> Result<PortalConfig, Vec<ConfigError>> {
    finish(loader::load_config(), || {
        loader::config_file_paths()
            .iter()
            .filter_map(|path| read_source(path))
            .collect()
    })
}

/// Load configuration from a specific TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<PortalConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![(diagnostic::INLINE_SOURCE.to_string(), toml_content.to_string())]
    })
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<PortalConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Validates a loaded config, or converts the load error using the TOML
/// text from `sources`, read only when something failed.
fn finish(
    loaded: Result<PortalConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<PortalConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::from_figment(err, &sources())),
    }
}

fn read_source(path: &Path) -> Option<(String, String)> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| (path.display().to_string(), content))
}
