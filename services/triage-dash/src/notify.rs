// services/triage-dash/src/notify.rs
//
// Transient notifications (toasts) and the activity log

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::store::RefreshOutcome;

const MAX_LOG_ENTRIES: usize = 100;
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Info => "[INF]",
            Level::Success => "[OK ]",
            Level::Warn => "[WRN]",
            Level::Error => "[ERR]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Level::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }
}

/// The single notification a refresh cycle produces, if any. A cycle where
/// every fetch failed yields one error rather than one per collection.
pub fn refresh_notice(outcome: &RefreshOutcome) -> Option<Notification> {
    match outcome {
        RefreshOutcome::Complete => None,
        RefreshOutcome::Partial { failed } => {
            let stale: Vec<&str> = failed.iter().map(|f| f.collection.as_str()).collect();
            Some(Notification::warn(format!(
                "Partial update: showing last known {}",
                stale.join(", ")
            )))
        }
        RefreshOutcome::Failed { .. } => Some(Notification::error("Failed to update data")),
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

#[derive(Debug, Clone)]
struct Toast {
    notification: Notification,
    expires_at: Instant,
}

pub struct Notifier {
    toasts: VecDeque<Toast>,
    log: VecDeque<LogEntry>,
    ttl: Duration,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            toasts: VecDeque::new(),
            log: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, notification: Notification) {
        self.push_at(notification, Instant::now());
    }

    pub fn push_at(&mut self, notification: Notification, now: Instant) {
        self.log.push_back(LogEntry {
            timestamp: Local::now(),
            level: notification.level,
            message: notification.message.clone(),
        });
        if self.log.len() > MAX_LOG_ENTRIES {
            self.log.pop_front();
        }

        self.toasts.push_back(Toast {
            notification,
            expires_at: now + self.ttl,
        });
        if self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    /// Drop expired toasts. Returns true if anything was removed.
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.expires_at > now);
        before != self.toasts.len()
    }

    pub fn active(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        self.toasts
            .iter()
            .filter(move |t| t.expires_at > now)
            .map(|t| &t.notification)
    }

    pub fn log(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.log.iter()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Collection, FetchFailure};
    use svckit::errors::DashError;

    fn failure(collection: Collection) -> FetchFailure {
        FetchFailure {
            collection,
            error: DashError::Network("HTTP 502".to_string()),
        }
    }

    #[test]
    fn test_refresh_notice_per_outcome() {
        assert_eq!(refresh_notice(&RefreshOutcome::Complete), None);

        let partial = RefreshOutcome::Partial {
            failed: vec![failure(Collection::Resources)],
        };
        let notice = refresh_notice(&partial).unwrap();
        assert_eq!(notice.level, Level::Warn);
        assert!(notice.message.contains("resources"));

        let failed = RefreshOutcome::Failed {
            failed: vec![
                failure(Collection::Patients),
                failure(Collection::Resources),
                failure(Collection::Stats),
            ],
        };
        assert_eq!(
            refresh_notice(&failed),
            Some(Notification::error("Failed to update data"))
        );
    }

    #[test]
    fn test_toasts_expire_but_log_remains() {
        let mut notifier = Notifier::new(Duration::from_secs(4));
        let start = Instant::now();
        notifier.push_at(Notification::success("Resource updated"), start);

        assert_eq!(notifier.active(start + Duration::from_secs(1)).count(), 1);
        assert_eq!(notifier.active(start + Duration::from_secs(5)).count(), 0);
        assert!(notifier.prune(start + Duration::from_secs(5)));
        assert_eq!(notifier.log().count(), 1);
    }

    #[test]
    fn test_toast_stack_is_bounded() {
        let mut notifier = Notifier::default();
        let now = Instant::now();
        for i in 0..10 {
            notifier.push_at(Notification::info(format!("n{}", i)), now);
        }
        let active: Vec<&str> = notifier.active(now).map(|n| n.message.as_str()).collect();
        assert_eq!(active, vec!["n6", "n7", "n8", "n9"]);
    }
}
