// Notifications - Problems worth showing to the user
// Feedback channels degrade silently; these tell the UI why

use ringbuf::traits::Producer;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::messaging::channels::NotificationProducer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Which feedback pathway the notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Audio,
    Haptics,
    Scheduler,
    Settings,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    pub timestamp: u64, // Unix timestamp in milliseconds
}

impl Notification {
    pub fn new(level: NotificationLevel, category: NotificationCategory, message: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            level,
            category,
            message,
            timestamp,
        }
    }

    pub fn info(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Error, category, message)
    }
}

/// Push without blocking; a busy lock or full buffer drops the notification
pub fn try_notify(tx: &Mutex<NotificationProducer>, notification: Notification) -> bool {
    match tx.try_lock() {
        Ok(mut tx) => tx.try_push(notification).is_ok(),
        Err(_) => false,
    }
}
