//! Notification dispatch for a drained batch.
//!
//! An empty batch is a no-op. Otherwise a single summary is composed from
//! the batch size and its most recent alert, then either logged (sending
//! disabled) or handed to the notification provider. Failures are counted
//! and never retried; the next cycle starts from a fresh batch.

use relay_common::config::NotifierConfig;
use relay_common::stats::{StatsTracker, unix_now};
use relay_common::types::{AlertMessage, Batch};
use relay_notifier::{NotificationProvider, NotifyError};

/// Result of one dispatch decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was drained; nothing to report.
    NoAlerts,
    /// Sending is disabled; the summary was written to the log.
    Logged { text: String },
    /// The provider accepted the summary.
    Sent { text: String, id: String },
    /// The provider failed or was not initialized.
    Failed { text: String, error: String },
}

/// Summary text for a batch of `count` alerts whose most recent entry is `last`.
///
/// The last alert is only quoted when its timestamp is a positive number;
/// otherwise the summary reports that it could not be processed.
pub fn compose_text(count: usize, last: Option<&AlertMessage>) -> String {
    let mut text = format!("Alerts found: {count}");
    match last.filter(|message| has_reportable_timestamp(message)) {
        Some(message) => text.push_str(&format!(
            ", Last alert: {}, Value: {}",
            message.timestamp,
            message.difference_text()
        )),
        None => text.push_str(", Error processing last alert."),
    }
    text
}

fn has_reportable_timestamp(message: &AlertMessage) -> bool {
    message.timestamp.numeric().is_some_and(|t| t > 0.0)
}

/// Decide whether to notify about `batch` and do it.
///
/// `provider` is `None` until the notification client has been initialized.
pub async fn dispatch<N>(
    batch: &Batch,
    config: &NotifierConfig,
    provider: Option<&N>,
    stats: &StatsTracker,
) -> DispatchOutcome
where
    N: NotificationProvider + ?Sized,
{
    if batch.is_empty() {
        return DispatchOutcome::NoAlerts;
    }

    let last = batch.most_recent();
    match last {
        None => {
            stats.record_notification_error(Some("Failed to resolve most recent alert".to_string()));
            tracing::error!(count = batch.len(), "Failed to resolve most recent alert");
        }
        Some(message) if !has_reportable_timestamp(message) => {
            tracing::warn!(
                timestamp = %message.timestamp,
                "Most recent alert has no usable timestamp"
            );
        }
        Some(_) => {}
    }
    let text = compose_text(batch.len(), last);

    if !config.send_notifications {
        tracing::info!(summary = %text, "Notifications disabled, logging summary");
        return DispatchOutcome::Logged { text };
    }

    let result = match provider {
        Some(provider) => {
            let to = config.notification_number.as_deref().unwrap_or_default();
            let from = config.twilio_number.as_deref().unwrap_or_default();
            provider.send(to, from, &text).await
        }
        None => Err(NotifyError::Unavailable(
            "Notification client not initialized".to_string(),
        )),
    };

    match result {
        Ok(sent) => {
            stats.record_notification_sent(unix_now());
            tracing::info!(
                id = %sent.id,
                sent_at = sent.sent_at.as_deref().unwrap_or("unknown"),
                count = batch.len(),
                "Notification sent"
            );
            DispatchOutcome::Sent { text, id: sent.id }
        }
        Err(e) => {
            let error = e.to_string();
            stats.record_notification_error(Some(error.clone()));
            tracing::error!(error = %error, count = batch.len(), "Notification failed");
            DispatchOutcome::Failed { text, error }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_text_with_last_alert() {
        let last = AlertMessage::parse(r#"{"timestamp": 200, "difference": 9}"#).unwrap();
        assert_eq!(
            compose_text(2, Some(&last)),
            "Alerts found: 2, Last alert: 200, Value: 9"
        );
    }

    #[test]
    fn test_compose_text_without_last_alert() {
        assert_eq!(
            compose_text(3, None),
            "Alerts found: 3, Error processing last alert."
        );
    }

    #[test]
    fn test_compose_text_string_values() {
        let last = AlertMessage::parse(r#"{"timestamp": "1714557600", "difference": "12.5%"}"#)
            .unwrap();
        assert_eq!(
            compose_text(1, Some(&last)),
            "Alerts found: 1, Last alert: 1714557600, Value: 12.5%"
        );
    }

    #[test]
    fn test_compose_text_unusable_timestamp() {
        for body in [
            r#"{"timestamp": 0, "difference": 5}"#,
            r#"{"timestamp": -3, "difference": 5}"#,
            r#"{"timestamp": "abc", "difference": 5}"#,
            r#"{"timestamp": "2024-05-01T10:00:00Z", "difference": 5}"#,
        ] {
            let last = AlertMessage::parse(body).unwrap();
            assert_eq!(
                compose_text(1, Some(&last)),
                "Alerts found: 1, Error processing last alert.",
                "{body}"
            );
        }
    }
}
