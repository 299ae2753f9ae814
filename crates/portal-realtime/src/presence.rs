// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence aggregation: which users are online, and since when.
//!
//! Entries are created by incremental updates or snapshots and never removed.
//! A user missing from the map is reported as offline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use portal_core::{PresenceState, UserId};

/// Last known presence of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEntry {
    pub online: bool,
    /// Never decreases for a given user.
    pub updated_at: DateTime<Utc>,
}

/// User id to presence map fed by `presence:update` and `presence:snapshot`.
#[derive(Debug, Default)]
pub struct PresenceAggregator {
    entries: HashMap<UserId, PresenceEntry>,
}

impl PresenceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an incremental update unconditionally.
    ///
    /// Updates carry no server sequence, so a late `offline` overwrites an
    /// earlier `online`. The stored timestamp is clamped so it never moves
    /// backwards when the local clock does.
    pub fn apply_update(&mut self, user: UserId, state: PresenceState, now: DateTime<Utc>) {
        let online = state == PresenceState::Online;
        self.upsert(user, online, now);
    }

    /// Marks every listed user online. Users absent from the list are untouched.
    pub fn apply_snapshot(&mut self, users: &[UserId], now: DateTime<Utc>) {
        for &user in users {
            self.upsert(user, true, now);
        }
    }

    fn upsert(&mut self, user: UserId, online: bool, now: DateTime<Utc>) {
        let updated_at = match self.entries.get(&user) {
            Some(prev) => prev.updated_at.max(now),
            None => now,
        };
        self.entries.insert(user, PresenceEntry { online, updated_at });
    }

    /// `false` for users never seen.
    pub fn is_online(&self, user: UserId) -> bool {
        self.entries.get(&user).is_some_and(|e| e.online)
    }

    pub fn last_seen(&self, user: UserId) -> Option<DateTime<Utc>> {
        self.entries.get(&user).map(|e| e.updated_at)
    }

    pub fn get(&self, user: UserId) -> Option<PresenceEntry> {
        self.entries.get(&user).copied()
    }

    /// Ids of all users currently online, ascending.
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.online)
            .map(|(id, _)| *id)
            .collect();
        users.sort_unstable();
        users
    }

    /// Copy of the full map, for UI consumers.
    pub fn snapshot(&self) -> HashMap<UserId, PresenceEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
