//! Transient user-facing notifications.
//!
//! Every operation that the page would announce with a toast pushes a
//! [`Notification`] here. Front ends read the active ones each frame; each
//! notification disappears three seconds after it was raised.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// How long a notification stays on screen.
pub const NOTIFICATION_TTL_MS: i64 = 3_000;

/// Upper bound on queued notifications; the oldest are dropped first.
const MAX_QUEUED: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NotificationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::milliseconds(NOTIFICATION_TTL_MS)
    }
}

/// Shared notification queue. Clone is cheap; all clones see the same queue.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    queue: Arc<Mutex<VecDeque<Notification>>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, level: NotificationLevel, message: impl Into<String>) {
        let notification = Notification {
            message: message.into(),
            level,
            created_at: Utc::now(),
        };
        debug!(level = level.label(), message = %notification.message, "Notification");
        let mut queue = self.queue();
        queue.push_back(notification);
        while queue.len() > MAX_QUEUED {
            queue.pop_front();
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NotificationLevel::Error, message);
    }

    /// Notifications still on screen at `now`, oldest first.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.queue()
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect()
    }

    /// Drop expired notifications.
    pub fn prune(&self, now: DateTime<Utc>) {
        self.queue().retain(|n| !n.is_expired(now));
    }

    /// Remove and return everything queued.
    pub fn drain(&self) -> Vec<Notification> {
        self.queue().drain(..).collect()
    }
}
