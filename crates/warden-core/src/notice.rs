// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! User-facing notices.
//!
//! Transport failures surface here as dismissible errors. Account
//! disablement raises a fatal notice that stays until the next sign-in.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bus::{EventBus, EventSubscriber};
use crate::error::{ErrorCategory, WardenError};

// =============================================================================
// Notice
// =============================================================================

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    /// Informational.
    Info,
    /// Something needs attention.
    Warning,
    /// An operation failed.
    Error,
    /// The session cannot continue. Not dismissible.
    Fatal,
}

impl NoticeSeverity {
    /// Returns the severity name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeSeverity::Info => "info",
            NoticeSeverity::Warning => "warning",
            NoticeSeverity::Error => "error",
            NoticeSeverity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for NoticeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A notice shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Unique notice ID.
    pub id: Uuid,
    /// Severity.
    pub severity: NoticeSeverity,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// When the notice was raised.
    pub created_at: DateTime<Utc>,
    /// Whether the user has seen it.
    pub read: bool,
}

impl Notice {
    /// Creates an unread notice.
    pub fn new(
        severity: NoticeSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            severity,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            read: false,
        }
    }

    /// Returns `true` unless the notice is fatal.
    pub fn is_dismissible(&self) -> bool {
        self.severity != NoticeSeverity::Fatal
    }

    /// Age of the notice as a short label relative to `now`.
    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        relative_time(self.created_at, now)
    }
}

/// Formats the time elapsed between `then` and `now`.
///
/// ```
/// use chrono::{Duration, Utc};
/// use warden_core::notice::relative_time;
///
/// let now = Utc::now();
/// assert_eq!(relative_time(now - Duration::seconds(30), now), "Just now");
/// assert_eq!(relative_time(now - Duration::minutes(5), now), "5 min ago");
/// ```
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    match seconds {
        s if s < 60 => "Just now".to_string(),
        s if s < 3_600 => format!("{} min ago", s / 60),
        s if s < 86_400 => format!("{} hour ago", s / 3_600),
        s => format!("{} day ago", s / 86_400),
    }
}

// =============================================================================
// Notice Center
// =============================================================================

/// Holds the current notices and broadcasts new ones.
#[derive(Debug, Clone)]
pub struct NoticeCenter {
    notices: Arc<RwLock<Vec<Notice>>>,
    bus: EventBus<Notice>,
}

impl Default for NoticeCenter {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NoticeCenter {
    /// Creates a center whose broadcast channel buffers `capacity` notices.
    pub fn new(capacity: usize) -> Self {
        Self {
            notices: Arc::new(RwLock::new(Vec::new())),
            bus: EventBus::new(capacity),
        }
    }

    /// Adds a notice and returns its ID.
    pub fn push(&self, notice: Notice) -> Uuid {
        let id = notice.id;
        self.notices.write().insert(0, notice.clone());
        self.bus.publish(notice);
        id
    }

    /// Adds an informational notice.
    pub fn info(&self, title: &str, message: &str) -> Uuid {
        self.push(Notice::new(NoticeSeverity::Info, title, message))
    }

    /// Adds a warning notice.
    pub fn warn(&self, title: &str, message: &str) -> Uuid {
        self.push(Notice::new(NoticeSeverity::Warning, title, message))
    }

    /// Adds an error notice.
    pub fn error(&self, title: &str, message: &str) -> Uuid {
        self.push(Notice::new(NoticeSeverity::Error, title, message))
    }

    /// Adds a fatal notice.
    pub fn fatal(&self, title: &str, message: &str) -> Uuid {
        self.push(Notice::new(NoticeSeverity::Fatal, title, message))
    }

    /// Surfaces an error with the severity its category calls for.
    ///
    /// Authorization and credential errors are shown inline by the caller and
    /// produce no notice; `None` is returned for them.
    pub fn from_error(&self, error: &WardenError) -> Option<Uuid> {
        let severity = match error.category() {
            ErrorCategory::Transport => NoticeSeverity::Error,
            ErrorCategory::Consistency => NoticeSeverity::Warning,
            ErrorCategory::Fatal => NoticeSeverity::Fatal,
            ErrorCategory::Credential | ErrorCategory::Authorization => return None,
        };
        Some(self.push(Notice::new(severity, "Something went wrong", error.user_message())))
    }

    /// Dismisses a notice. Returns `false` if it is missing or fatal.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut notices = self.notices.write();
        match notices.iter().position(|n| n.id == id) {
            Some(index) if notices[index].is_dismissible() => {
                notices.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Removes every fatal notice. Called after a successful sign-in.
    pub fn clear_fatal(&self) {
        self.notices.write().retain(|n| n.is_dismissible());
    }

    /// Removes every dismissible notice.
    pub fn clear(&self) {
        self.notices.write().retain(|n| !n.is_dismissible());
    }

    /// Marks a notice as read.
    pub fn mark_read(&self, id: Uuid) -> bool {
        let mut notices = self.notices.write();
        match notices.iter_mut().find(|n| n.id == id) {
            Some(notice) => {
                notice.read = true;
                true
            }
            None => false,
        }
    }

    /// Marks every notice as read.
    pub fn mark_all_read(&self) {
        for notice in self.notices.write().iter_mut() {
            notice.read = true;
        }
    }

    /// Number of unread notices.
    pub fn unread_count(&self) -> usize {
        self.notices.read().iter().filter(|n| !n.read).count()
    }

    /// Current notices, newest first.
    pub fn list(&self) -> Vec<Notice> {
        self.notices.read().clone()
    }

    /// Returns `true` while a fatal notice is present.
    pub fn has_fatal(&self) -> bool {
        self.notices.read().iter().any(|n| !n.is_dismissible())
    }

    /// Subscribes to newly raised notices.
    pub fn subscribe(&self) -> EventSubscriber<Notice> {
        self.bus.subscribe()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, StoreError};
    use chrono::Duration;

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(relative_time(now, now), "Just now");
        assert_eq!(relative_time(now - Duration::minutes(59), now), "59 min ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3 hour ago");
        assert_eq!(relative_time(now - Duration::days(2), now), "2 day ago");
    }

    #[test]
    fn test_fatal_notice_not_dismissible() {
        let center = NoticeCenter::default();
        let fatal = center.fatal("Account disabled", "Contact an administrator");
        let info = center.info("Saved", "Settings saved");

        assert!(!center.dismiss(fatal));
        assert!(center.dismiss(info));
        assert!(center.has_fatal());

        center.clear_fatal();
        assert!(center.list().is_empty());
    }

    #[test]
    fn test_from_error_maps_category() {
        let center = NoticeCenter::default();

        let transport: WardenError = StoreError::unavailable("down").into();
        let id = center.from_error(&transport).unwrap();
        assert_eq!(center.list()[0].id, id);
        assert_eq!(center.list()[0].severity, NoticeSeverity::Error);

        let credential: WardenError = AuthError::InvalidCredential.into();
        assert!(center.from_error(&credential).is_none());
    }

    #[test]
    fn test_unread_tracking() {
        let center = NoticeCenter::default();
        let a = center.info("a", "a");
        center.info("b", "b");
        assert_eq!(center.unread_count(), 2);

        center.mark_read(a);
        assert_eq!(center.unread_count(), 1);
        center.mark_all_read();
        assert_eq!(center.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_notices() {
        let center = NoticeCenter::default();
        let mut subscriber = center.subscribe();
        center.warn("Heads up", "Something changed");

        let notice = subscriber.recv().await.unwrap();
        assert_eq!(notice.severity, NoticeSeverity::Warning);
    }
}
