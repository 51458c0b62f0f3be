//! De-duplicated, newest-first notification log.

use std::collections::{HashSet, VecDeque};

use crate::notification::model::Notification;

/// Ordered set of notifications keyed by id.
///
/// Entries are kept newest-first by arrival. The unread count is computed
/// from the entries themselves, so it cannot drift from the `read` flags.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    ids: HashSet<String>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts at the head unless the id is already present.
    ///
    /// Returns `true` if the notification was inserted.
    pub fn append(&mut self, notification: Notification) -> bool {
        if !self.ids.insert(notification.id.clone()) {
            tracing::trace!(
                "[NotificationLog] Duplicate notification {} ignored",
                notification.id
            );
            return false;
        }
        self.entries.push_front(notification);
        true
    }

    /// Marks one entry read. Returns `true` if its state changed.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.entries.iter_mut().find(|n| n.id == id) {
            Some(entry) if !entry.read => {
                entry.read = true;
                true
            }
            _ => false,
        }
    }

    /// Marks every entry read.
    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            entry.read = true;
        }
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Entries newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    /// Unread entries newest-first.
    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().filter(|n| !n.read)
    }

    /// Owned copy of the entries newest-first.
    pub fn to_vec(&self) -> Vec<Notification> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Used when a session ends.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }
}
