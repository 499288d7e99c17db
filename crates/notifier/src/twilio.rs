//! Twilio Programmable Messaging client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use relay_common::config::NotifierConfig;

use crate::{NotificationProvider, NotifyError, SentNotification};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    date_created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResource {
    message: String,
    code: Option<u64>,
}

/// SMS client authenticated with an account SID and auth token.
pub struct TwilioClient {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(account_sid: &str, auth_token: &str) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    /// Build a client from a ready configuration.
    pub fn from_config(config: &NotifierConfig) -> Result<Self, NotifyError> {
        match (&config.twilio_sid, &config.twilio_auth_token) {
            (Some(sid), Some(token)) => Self::new(sid, token),
            _ => Err(NotifyError::Unavailable(
                "Twilio credentials are not configured".to_string(),
            )),
        }
    }

    /// Point the client at a different API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl NotificationProvider for TwilioClient {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<SentNotification, NotifyError> {
        tracing::debug!(chars = body.chars().count(), "Sending SMS");

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = rejection_message(&text);
            tracing::warn!(status = status.as_u16(), error = %message, "Twilio rejected message");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = response.json().await?;
        tracing::debug!(sid = %resource.sid, "Twilio accepted message");
        Ok(SentNotification {
            id: resource.sid,
            sent_at: resource.date_created,
        })
    }
}

/// Extract Twilio's error message from a response body, falling back to the raw text.
fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResource>(body) {
        Ok(ErrorResource {
            message,
            code: Some(code),
        }) => format!("{message} (code {code})"),
        Ok(ErrorResource { message, code: None }) => message,
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        let client = TwilioClient::new("AC123", "token").unwrap();
        assert_eq!(
            client.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );

        let client = client.with_api_base("http://localhost:8080/");
        assert_eq!(
            client.messages_url(),
            "http://localhost:8080/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_from_config_without_credentials_is_unavailable() {
        let result = TwilioClient::from_config(&NotifierConfig::default());
        assert!(matches!(result, Err(NotifyError::Unavailable(_))));
    }

    #[test]
    fn test_rejection_message_parses_twilio_error() {
        let body = r#"{"code": 21211, "message": "Invalid 'To' Phone Number", "status": 400}"#;
        assert_eq!(
            rejection_message(body),
            "Invalid 'To' Phone Number (code 21211)"
        );
        assert_eq!(rejection_message("gateway down"), "gateway down");
    }
}
