//! Toast notifications.
//!
//! Views report outcomes through the [`Notifier`] capability; the shell owns
//! a [`ToastNotifier`] and renders whatever it currently holds.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub created_at: Instant,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            created_at: Instant::now(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title, message)
    }
}

pub trait Notifier: Send {
    fn notify(&mut self, notification: Notification);

    /// The notification to show right now, if any.
    fn current(&self) -> Option<&Notification>;

    /// Drops notifications older than their display time.
    fn expire(&mut self, now: Instant);
}

/// Recent toasts; the newest one is shown, and each expires a fixed time
/// after it was raised.
pub struct ToastNotifier {
    queue: VecDeque<Notification>,
    ttl: Duration,
}

impl ToastNotifier {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(4);
    const MAX_QUEUED: usize = 8;

    pub fn new(ttl: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            ttl,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for ToastNotifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

impl Notifier for ToastNotifier {
    fn notify(&mut self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => error!("{}: {}", notification.title, notification.message),
            NotificationLevel::Warning => warn!("{}: {}", notification.title, notification.message),
            _ => info!("{}: {}", notification.title, notification.message),
        }
        if self.queue.len() >= Self::MAX_QUEUED {
            self.queue.pop_front();
        }
        self.queue.push_back(notification);
    }

    fn current(&self) -> Option<&Notification> {
        self.queue.back()
    }

    fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.queue
            .retain(|toast| now.saturating_duration_since(toast.created_at) < ttl);
    }
}
