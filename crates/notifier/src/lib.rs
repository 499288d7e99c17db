//! Notification provider boundary and the Twilio SMS implementation.

pub mod twilio;

use async_trait::async_trait;
use thiserror::Error;

/// Provider acknowledgment of a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    /// Provider-assigned message id
    pub id: String,
    /// Provider-reported creation time, verbatim
    pub sent_at: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Notification provider unavailable: {0}")]
    Unavailable(String),
}

/// Sends a text notification to a single destination.
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<SentNotification, NotifyError>;
}
