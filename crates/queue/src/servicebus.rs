//! Azure Service Bus queue client over the REST API.
//!
//! Uses peek-lock receives (`POST .../messages/head`) and explicit deletes of
//! the locked message. Requests are authorized with a shared access
//! signature derived from the configured policy name and key.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, LOCATION};
use serde::Deserialize;
use sha2::Sha256;

use relay_common::config::NotifierConfig;
use relay_common::stats::unix_now;

use crate::provider::{QueueError, QueueProvider, ReceivedMessage};

/// Lifetime of each generated SAS token.
const SAS_TOKEN_TTL_SECS: i64 = 3600;

/// Upper bound on a single HTTP exchange, above the longest receive wait.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE_BUS_HOST_SUFFIX: &str = ".servicebus.windows.net";

/// Subset of the `BrokerProperties` header needed to delete a message.
#[derive(Debug, Deserialize)]
struct BrokerProperties {
    #[serde(rename = "MessageId")]
    message_id: String,
    #[serde(rename = "LockToken")]
    lock_token: String,
}

/// REST client bound to one queue.
pub struct ServiceBusClient {
    http: reqwest::Client,
    queue: String,
    queue_uri: String,
    key_name: String,
    key: String,
}

impl ServiceBusClient {
    pub fn new(
        namespace: &str,
        queue: &str,
        key_name: &str,
        key: &str,
    ) -> Result<Self, QueueError> {
        let namespace = namespace.trim();
        let queue = queue.trim().trim_matches('/');
        if namespace.is_empty() || namespace.contains('/') {
            return Err(QueueError::Protocol(format!(
                "Invalid Service Bus namespace: {namespace:?}"
            )));
        }
        if queue.is_empty() {
            return Err(QueueError::Protocol("Queue name is empty".to_string()));
        }

        let host = if namespace.contains('.') {
            namespace.to_string()
        } else {
            format!("{namespace}{SERVICE_BUS_HOST_SUFFIX}")
        };

        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http,
            queue: queue.to_string(),
            queue_uri: format!("https://{host}/{queue}"),
            key_name: key_name.to_string(),
            key: key.to_string(),
        })
    }

    /// Build a client from a ready configuration.
    pub fn from_config(config: &NotifierConfig) -> Result<Self, QueueError> {
        let field = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| QueueError::Protocol(format!("{name} is not configured")))
        };
        Self::new(
            &field(&config.service_bus_namespace, "namespace")?,
            &field(&config.service_bus_queue, "queue")?,
            &field(&config.shared_access_name, "shared access name")?,
            &field(&config.shared_access_key, "shared access key")?,
        )
    }

    /// Send requests to `endpoint` (scheme and host) instead of the namespace host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.queue_uri = format!("{}/{}", endpoint.trim_end_matches('/'), self.queue);
        self
    }

    pub fn queue_uri(&self) -> &str {
        &self.queue_uri
    }

    /// Shared access signature valid until `expiry` (Unix seconds).
    pub fn sas_token(&self, expiry: i64) -> Result<String, QueueError> {
        let resource = urlencoding::encode(&self.queue_uri);
        let string_to_sign = format!("{resource}\n{expiry}");

        let mut mac = Hmac::<Sha256>::new_from_slice(self.key.as_bytes())
            .map_err(|e| QueueError::Auth(format!("Failed to create HMAC: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!(
            "SharedAccessSignature sr={resource}&sig={}&se={expiry}&skn={}",
            urlencoding::encode(&signature),
            self.key_name
        ))
    }

    fn authorization(&self) -> Result<String, QueueError> {
        self.sas_token(unix_now() + SAS_TOKEN_TTL_SECS)
    }

    fn delete_uri(&self, message: &ReceivedMessage) -> String {
        match &message.lock_location {
            Some(location) => location.clone(),
            None => format!(
                "{}/messages/{}/{}",
                self.queue_uri,
                urlencoding::encode(&message.message_id),
                urlencoding::encode(&message.lock_token)
            ),
        }
    }
}

#[async_trait]
impl QueueProvider for ServiceBusClient {
    async fn receive_one(&self, timeout: Duration) -> Result<Option<ReceivedMessage>, QueueError> {
        let url = format!(
            "{}/messages/head?timeout={}",
            self.queue_uri,
            timeout.as_secs().max(1)
        );

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.authorization()?)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::CREATED | StatusCode::OK => {
                let properties = response
                    .headers()
                    .get("BrokerProperties")
                    .ok_or_else(|| QueueError::Protocol("Missing BrokerProperties header".into()))?
                    .to_str()
                    .map_err(|e| QueueError::Protocol(format!("Bad BrokerProperties header: {e}")))?;
                let properties: BrokerProperties = serde_json::from_str(properties)
                    .map_err(|e| QueueError::Protocol(format!("Bad BrokerProperties header: {e}")))?;
                let lock_location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                let body = response.text().await?;

                tracing::debug!(
                    message_id = %properties.message_id,
                    bytes = body.len(),
                    "Received locked message"
                );

                Ok(Some(ReceivedMessage {
                    message_id: properties.message_id,
                    lock_token: properties.lock_token,
                    lock_location,
                    body,
                }))
            }
            status => Err(QueueError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn delete(&self, message: &ReceivedMessage) -> Result<(), QueueError> {
        let response = self
            .http
            .delete(self.delete_uri(message))
            .header(AUTHORIZATION, self.authorization()?)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(QueueError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
