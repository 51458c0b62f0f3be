//! Notification log shared between the channel task and readers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use storefront_core::notification::{Notification, NotificationLog};

/// Cloneable handle to one [`NotificationLog`].
///
/// The channel manager appends from its background task; UI readers pull
/// through the same handle. Every method takes the lock once, so a reader
/// never sees a partially applied `mark_all_read`.
#[derive(Debug, Clone, Default)]
pub struct SharedNotificationLog {
    inner: Arc<Mutex<NotificationLog>>,
}

impl SharedNotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NotificationLog> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the notification was new.
    pub fn append(&self, notification: Notification) -> bool {
        self.lock().append(notification)
    }

    pub fn mark_read(&self, id: &str) -> bool {
        self.lock().mark_read(id)
    }

    pub fn mark_all_read(&self) {
        self.lock().mark_all_read();
    }

    pub fn unread_count(&self) -> usize {
        self.lock().unread_count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    /// Newest-first copy of the entries.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.lock().to_vec()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
