//! Queue drain loop.
//!
//! Receives one message at a time, deletes it, and accumulates the parsed
//! body into a [`Batch`] until the queue reports empty or a receive fails.
//! Messages are deleted before they are parsed, so a malformed body is still
//! consumed and a crash between delete and accumulate loses that message.

use std::time::Duration;

use relay_common::stats::StatsTracker;
use relay_common::types::{AlertMessage, Batch};

use crate::provider::QueueProvider;

/// Longest wait for a message to appear on each receive.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between consecutive receives.
pub const DEFAULT_RECEIVE_DELAY: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSettings {
    pub receive_timeout: Duration,
    pub receive_delay: Duration,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            receive_delay: DEFAULT_RECEIVE_DELAY,
        }
    }
}

/// Why a drain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainEnd {
    /// The queue reported no messages available.
    Exhausted,
    /// A receive failed; the error was counted and the cycle ends early.
    ReceiveFailed,
}

/// Outcome of one drain.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    pub batch: Batch,
    pub end: DrainEnd,
    /// Receive attempts issued, including the terminating one.
    pub receives: u64,
}

/// Drain `queue` into a fresh batch.
pub async fn drain_queue<Q>(queue: &Q, stats: &StatsTracker, settings: &DrainSettings) -> DrainReport
where
    Q: QueueProvider + ?Sized,
{
    let mut batch = Batch::new();
    let mut receives = 0u64;

    loop {
        receives += 1;
        let message = match queue.receive_one(settings.receive_timeout).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::debug!(messages = batch.len(), "Queue drained");
                return DrainReport {
                    batch,
                    end: DrainEnd::Exhausted,
                    receives,
                };
            }
            Err(e) => {
                stats.record_queue_error();
                tracing::warn!(error = %e, messages = batch.len(), "Queue receive failed, ending drain");
                return DrainReport {
                    batch,
                    end: DrainEnd::ReceiveFailed,
                    receives,
                };
            }
        };

        match queue.delete(&message).await {
            Ok(()) => {
                stats.record_queue_read();
                accumulate(&mut batch, &message.body, stats);
            }
            Err(e) => {
                stats.record_queue_error();
                tracing::warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to delete message"
                );
            }
        }

        tokio::time::sleep(settings.receive_delay).await;
    }
}

/// Parse a message body into the batch, counting the outcome.
fn accumulate(batch: &mut Batch, body: &str, stats: &StatsTracker) {
    if body.trim().is_empty() {
        tracing::debug!("Skipping empty message body");
        return;
    }

    match AlertMessage::parse(body) {
        Ok(message) => {
            tracing::debug!(timestamp = %message.timestamp, "Accumulated alert");
            if let Some(previous) = batch.insert(message) {
                tracing::debug!(timestamp = %previous.timestamp, "Replaced alert with same timestamp");
            }
            stats.record_queue_message();
        }
        Err(e) => {
            stats.record_queue_error();
            tracing::warn!(error = %e, "Dropping malformed message body");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_counts_outcomes() {
        let stats = StatsTracker::new();
        let mut batch = Batch::new();

        accumulate(&mut batch, r#"{"timestamp": 1, "difference": 2}"#, &stats);
        accumulate(&mut batch, "{broken", &stats);
        accumulate(&mut batch, "   ", &stats);

        let counters = stats.current().queue;
        assert_eq!(batch.len(), 1);
        assert_eq!(counters.messages, 1);
        assert_eq!(counters.errors, 1);
    }

    #[test]
    fn test_default_settings() {
        let settings = DrainSettings::default();
        assert_eq!(settings.receive_timeout, Duration::from_secs(5));
        assert_eq!(settings.receive_delay, Duration::from_millis(25));
    }
}
