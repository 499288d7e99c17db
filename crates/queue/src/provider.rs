//! Queue provider boundary.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A message held under a peek-lock until it is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Broker-assigned message id
    pub message_id: String,
    /// Lock token identifying this delivery
    pub lock_token: String,
    /// Location used to delete the locked message, when the broker supplies one
    pub lock_location: Option<String>,
    /// Raw message body
    pub body: String,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Queue returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Queue protocol error: {0}")]
    Protocol(String),

    #[error("Queue authentication error: {0}")]
    Auth(String),
}

/// Receive-and-delete access to a single queue.
#[async_trait]
pub trait QueueProvider: Send + Sync {
    /// Receive at most one message under a peek-lock, waiting up to `timeout`.
    ///
    /// `Ok(None)` means the queue currently has no messages.
    async fn receive_one(&self, timeout: Duration) -> Result<Option<ReceivedMessage>, QueueError>;

    /// Acknowledge a received message, removing it from the queue.
    async fn delete(&self, message: &ReceivedMessage) -> Result<(), QueueError>;
}
