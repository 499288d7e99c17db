//! Process-wide counters for queue draining and notification delivery.
//!
//! All mutation happens on the single scheduler timeline through
//! [`StatsTracker`]. Every change is published on a `watch` channel so the
//! status surface can read consistent snapshots through [`StatsHandle`]
//! without sharing mutable state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub sent: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    /// Unix seconds of the last successful send, `0` if none.
    pub last_sent: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Messages received and acknowledged.
    pub read: u64,
    /// Messages parsed and added to a batch.
    pub messages: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningStats {
    pub startup: i64,
    /// Unix seconds when configuration first became complete, `0` until then.
    pub ready: i64,
    pub now: i64,
}

/// Snapshot of every counter group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub notifications: NotificationStats,
    pub queue: QueueStats,
    pub running: RunningStats,
}

impl Stats {
    pub fn started_at(startup: i64) -> Self {
        Self {
            running: RunningStats {
                startup,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Owner of the counters. Not `Clone`: there is exactly one writer.
#[derive(Debug)]
pub struct StatsTracker {
    tx: watch::Sender<Stats>,
}

impl StatsTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Stats::started_at(unix_now()));
        Self { tx }
    }

    /// Read-only handle for the status surface.
    pub fn handle(&self) -> StatsHandle {
        StatsHandle {
            rx: self.tx.subscribe(),
        }
    }

    /// Current counters without refreshing `running.now`.
    pub fn current(&self) -> Stats {
        self.tx.borrow().clone()
    }

    pub fn record_queue_read(&self) {
        self.tx.send_modify(|s| s.queue.read += 1);
    }

    pub fn record_queue_message(&self) {
        self.tx.send_modify(|s| s.queue.messages += 1);
    }

    pub fn record_queue_error(&self) {
        self.tx.send_modify(|s| s.queue.errors += 1);
    }

    pub fn record_notification_sent(&self, at: i64) {
        self.tx.send_modify(|s| {
            s.notifications.sent += 1;
            s.notifications.last_sent = at;
        });
    }

    /// Count a notification error. `detail` overwrites `last_error` when given.
    pub fn record_notification_error(&self, detail: Option<String>) {
        self.tx.send_modify(|s| {
            s.notifications.errors += 1;
            if let Some(detail) = detail {
                s.notifications.last_error = Some(detail);
            }
        });
    }

    /// Stamp the readiness time. Later calls are ignored.
    pub fn mark_ready(&self, at: i64) {
        self.tx.send_if_modified(|s| {
            if s.running.ready == 0 {
                s.running.ready = at;
                true
            } else {
                false
            }
        });
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable read-only view of the counters.
#[derive(Debug, Clone)]
pub struct StatsHandle {
    rx: watch::Receiver<Stats>,
}

impl StatsHandle {
    /// Latest counters with `running.now` set to the current time.
    pub fn snapshot(&self) -> Stats {
        let mut stats = self.rx.borrow().clone();
        stats.running.now = unix_now();
        stats
    }

    /// Whether the configuration gate has ever opened.
    pub fn is_running(&self) -> bool {
        self.rx.borrow().running.ready > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_starts_at_zero() {
        let tracker = StatsTracker::new();
        let stats = tracker.current();
        assert!(stats.running.startup > 0);
        assert_eq!(stats.running.ready, 0);
        assert_eq!(stats.queue, QueueStats::default());
        assert_eq!(stats.notifications, NotificationStats::default());
    }

    #[test]
    fn test_handle_sees_mutations() {
        let tracker = StatsTracker::new();
        let handle = tracker.handle();

        tracker.record_queue_read();
        tracker.record_queue_message();
        tracker.record_queue_error();
        tracker.record_notification_sent(42);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.queue.read, 1);
        assert_eq!(snapshot.queue.messages, 1);
        assert_eq!(snapshot.queue.errors, 1);
        assert_eq!(snapshot.notifications.sent, 1);
        assert_eq!(snapshot.notifications.last_sent, 42);
        assert!(snapshot.running.now >= snapshot.running.startup);
    }

    #[test]
    fn test_notification_error_keeps_last_detail() {
        let tracker = StatsTracker::new();
        tracker.record_notification_error(Some("timeout".to_string()));
        tracker.record_notification_error(None);

        let stats = tracker.current();
        assert_eq!(stats.notifications.errors, 2);
        assert_eq!(stats.notifications.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_ready_is_latched_once() {
        let tracker = StatsTracker::new();
        let handle = tracker.handle();
        assert!(!handle.is_running());

        tracker.mark_ready(100);
        tracker.mark_ready(200);

        assert!(handle.is_running());
        assert_eq!(tracker.current().running.ready, 100);
    }

    #[test]
    fn test_repeated_snapshots_only_differ_in_now() {
        let tracker = StatsTracker::new();
        tracker.record_queue_message();
        let handle = tracker.handle();

        let mut first = handle.snapshot();
        let mut second = handle.snapshot();
        first.running.now = 0;
        second.running.now = 0;
        assert_eq!(first, second);
    }
}
