//! User-facing notifications (the toast layer).
//!
//! Engines report stock corrections, rejected operations and sync failures
//! through a [`Notifier`]. Rendering them is up to the consumer.

use std::sync::Arc;

use parking_lot::Mutex;
use shopkeep_core::NotificationLevel;

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Buffers notifications until they are taken.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    buffer: Arc<Mutex<Vec<Notification>>>,
}

impl CollectingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything collected so far.
    #[must_use]
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Copy of everything collected so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.buffer.lock().clone()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        self.buffer.lock().push(notification);
    }
}
