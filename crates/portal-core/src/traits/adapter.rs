// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by transport and API adapters.

/// Identity shared by every adapter a session is built from.
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short name used in log fields, e.g. `websocket` or `http`.
    fn name(&self) -> &str;
}
