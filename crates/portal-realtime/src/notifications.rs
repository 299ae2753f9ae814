// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification buffer and toast deduplication.
//!
//! The buffer holds at most `capacity` entries, newest first, with unique ids.
//! A `read_at` timestamp, once set, is never cleared: not by a second
//! acknowledge and not by a bulk refetch that still reports the entry unread.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use portal_core::{Notification, NotificationId};

/// Default number of notifications kept in the buffer.
pub const DEFAULT_CAPACITY: usize = 100;

/// Ordered, capped, deduplicated notification buffer.
#[derive(Debug)]
pub struct NotificationChannel {
    entries: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Replaces the buffer with a bulk-fetched list.
    ///
    /// The list is deduplicated, sorted newest first and capped. Entries that
    /// were already read locally keep their local `read_at`.
    pub fn replace_all(&mut self, fetched: Vec<Notification>) {
        let local_reads: HashMap<NotificationId, DateTime<Utc>> = self
            .entries
            .iter()
            .filter_map(|n| n.read_at.map(|at| (n.id, at)))
            .collect();

        let mut fetched = fetched;
        fetched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut seen = HashSet::with_capacity(fetched.len());
        self.entries = fetched
            .into_iter()
            .filter(|n| seen.insert(n.id))
            .take(self.capacity)
            .map(|mut n| {
                if let Some(at) = local_reads.get(&n.id) {
                    n.read_at = Some(*at);
                }
                n
            })
            .collect();
    }

    /// Prepends a pushed notification unless its id is already buffered.
    ///
    /// Returns `true` if the notification was inserted. The oldest entries are
    /// evicted to stay within capacity.
    pub fn push_new(&mut self, notification: Notification) -> bool {
        if self.contains(notification.id) {
            return false;
        }
        self.entries.push_front(notification);
        self.entries.truncate(self.capacity);
        true
    }

    /// Marks one entry read if it is not already.
    ///
    /// Returns `true` if `read_at` was set by this call.
    pub fn acknowledge(&mut self, id: NotificationId, now: DateTime<Utc>) -> bool {
        match self.entries.iter_mut().find(|n| n.id == id) {
            Some(n) if n.read_at.is_none() => {
                n.read_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Marks every unread entry read. Returns the number of entries changed.
    pub fn acknowledge_all(&mut self, now: DateTime<Utc>) -> usize {
        let mut changed = 0;
        for n in self.entries.iter_mut().filter(|n| n.read_at.is_none()) {
            n.read_at = Some(now);
            changed += 1;
        }
        changed
    }

    /// Removes an entry locally. Returns `true` if it was present.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.is_read()).count()
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.entries.iter().any(|n| n.id == id)
    }

    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    /// Buffer contents, newest first.
    pub fn list(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Session-scoped set of notification ids already shown as a toast.
#[derive(Debug, Default)]
pub struct ToastDedup {
    seen: HashSet<NotificationId>,
}

impl ToastDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` and returns `true` the first time it is offered.
    pub fn should_toast(&mut self, id: NotificationId) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use portal_core::UserId;

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn note(id: u64, minutes: i64) -> Notification {
        Notification {
            id: NotificationId(id),
            user_id: UserId(1),
            kind: "task_assigned".to_string(),
            entity_type: Some("task".to_string()),
            entity_id: Some(id),
            message: format!("notification {id}"),
            metadata: serde_json::json!({}),
            created_at: base() + Duration::minutes(minutes),
            read_at: None,
        }
    }

    #[test]
    fn push_dedups_and_prepends() {
        let mut channel = NotificationChannel::new();
        assert!(channel.push_new(note(1, 0)));
        assert!(channel.push_new(note(2, 1)));
        assert!(!channel.push_new(note(1, 0)));

        let ids: Vec<u64> = channel.list().iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(channel.unread_count(), 2);
    }

    #[test]
    fn buffer_never_exceeds_capacity() {
        let mut channel = NotificationChannel::new();
        for id in 0..150 {
            channel.push_new(note(id, id as i64));
        }
        assert_eq!(channel.len(), DEFAULT_CAPACITY);
        // Oldest evicted first.
        assert!(!channel.contains(NotificationId(0)));
        assert!(!channel.contains(NotificationId(49)));
        assert!(channel.contains(NotificationId(50)));
        assert_eq!(channel.list()[0].id, NotificationId(149));
    }

    #[test]
    fn replace_all_sorts_dedups_and_caps() {
        let mut channel = NotificationChannel::with_capacity(3);
        channel.replace_all(vec![note(1, 1), note(4, 4), note(2, 2), note(4, 4), note(3, 3)]);

        let ids: Vec<u64> = channel.list().iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![4, 3, 2]);
    }

    #[test]
    fn acknowledge_is_idempotent_and_keeps_first_read_at() {
        let mut channel = NotificationChannel::new();
        channel.push_new(note(7, 0));

        let first = base() + Duration::hours(1);
        assert!(channel.acknowledge(NotificationId(7), first));
        assert!(!channel.acknowledge(NotificationId(7), first + Duration::hours(1)));

        assert_eq!(channel.get(NotificationId(7)).unwrap().read_at, Some(first));
        assert_eq!(channel.unread_count(), 0);
    }

    #[test]
    fn acknowledge_unknown_id_is_noop() {
        let mut channel = NotificationChannel::new();
        assert!(!channel.acknowledge(NotificationId(99), base()));
    }

    #[test]
    fn acknowledge_all_marks_only_unread() {
        let mut channel = NotificationChannel::new();
        channel.push_new(note(1, 0));
        channel.push_new(note(2, 1));
        channel.acknowledge(NotificationId(1), base());

        assert_eq!(channel.acknowledge_all(base() + Duration::hours(1)), 1);
        assert_eq!(channel.get(NotificationId(1)).unwrap().read_at, Some(base()));
        assert_eq!(channel.unread_count(), 0);
    }

    #[test]
    fn refetch_does_not_clear_local_read() {
        let mut channel = NotificationChannel::new();
        channel.push_new(note(1, 0));
        channel.acknowledge(NotificationId(1), base());

        channel.replace_all(vec![note(1, 0), note(2, 1)]);
        assert_eq!(channel.get(NotificationId(1)).unwrap().read_at, Some(base()));
        assert_eq!(channel.unread_count(), 1);
    }

    #[test]
    fn dismiss_removes_locally() {
        let mut channel = NotificationChannel::new();
        channel.push_new(note(1, 0));
        assert!(channel.dismiss(NotificationId(1)));
        assert!(!channel.dismiss(NotificationId(1)));
        assert!(channel.is_empty());
    }

    #[test]
    fn toast_shown_at_most_once() {
        let mut toasts = ToastDedup::new();
        assert!(toasts.should_toast(NotificationId(3)));
        assert!(!toasts.should_toast(NotificationId(3)));
        assert!(toasts.should_toast(NotificationId(4)));
        assert_eq!(toasts.len(), 2);
    }
}
