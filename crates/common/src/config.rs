use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ConfigError;

pub const SERVICE_BUS_NAMESPACE: &str = "AZURE_SERVICE_BUS_NAMESPACE";
pub const SERVICE_BUS_QUEUE: &str = "AZURE_SERVICE_BUS_QUEUE";
pub const SERVICE_BUS_SHARED_ACCESS_NAME: &str = "AZURE_SERVICE_BUS_SHARED_ACCESS_NAME";
pub const SERVICE_BUS_SHARED_ACCESS_KEY: &str = "AZURE_SERVICE_BUS_SHARED_ACCESS_KEY";
pub const TWILIO_SID: &str = "TWILIO_SID";
pub const TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const TWILIO_PHONE_NUMBER: &str = "TWILIO_PHONE_NUMBER";
pub const NOTIFICATION_NUMBER: &str = "NOTIFICATION_NUMBER";
pub const SEND_NOTIFICATIONS: &str = "SEND_NOTIFICATIONS";

/// Placeholder written in place of credential-like values on the status surface.
pub const MASK: &str = "********";

/// Substrings that mark a configuration key as credential-like.
const SENSITIVE_MARKERS: [&str; 4] = ["KEY", "AUTH", "NUMBER", "SID"];

/// Default HTTP listen port.
const DEFAULT_PORT: u16 = 5000;

/// Per-cycle notifier configuration, re-read from the environment before every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Service Bus namespace (`<namespace>.servicebus.windows.net`)
    pub service_bus_namespace: Option<String>,

    /// Queue drained by each cycle
    pub service_bus_queue: Option<String>,

    /// Shared access policy name
    pub shared_access_name: Option<String>,

    /// Shared access policy key
    pub shared_access_key: Option<String>,

    /// Twilio account SID
    pub twilio_sid: Option<String>,

    /// Twilio auth token
    pub twilio_auth_token: Option<String>,

    /// Twilio sender number
    pub twilio_number: Option<String>,

    /// Destination number for alert summaries
    pub notification_number: Option<String>,

    /// When false, composed summaries are only logged.
    pub send_notifications: bool,
}

impl NotifierConfig {
    /// Load the notifier configuration from the current process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            service_bus_namespace: lookup(SERVICE_BUS_NAMESPACE),
            service_bus_queue: lookup(SERVICE_BUS_QUEUE),
            shared_access_name: lookup(SERVICE_BUS_SHARED_ACCESS_NAME),
            shared_access_key: lookup(SERVICE_BUS_SHARED_ACCESS_KEY),
            twilio_sid: lookup(TWILIO_SID),
            twilio_auth_token: lookup(TWILIO_AUTH_TOKEN),
            twilio_number: lookup(TWILIO_PHONE_NUMBER),
            notification_number: lookup(NOTIFICATION_NUMBER),
            send_notifications: lookup(SEND_NOTIFICATIONS)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .is_some_and(|v| v == 1),
        }
    }

    fn required(&self) -> [(&'static str, Option<&str>); 8] {
        [
            (SERVICE_BUS_NAMESPACE, self.service_bus_namespace.as_deref()),
            (SERVICE_BUS_QUEUE, self.service_bus_queue.as_deref()),
            (SERVICE_BUS_SHARED_ACCESS_NAME, self.shared_access_name.as_deref()),
            (SERVICE_BUS_SHARED_ACCESS_KEY, self.shared_access_key.as_deref()),
            (TWILIO_SID, self.twilio_sid.as_deref()),
            (TWILIO_AUTH_TOKEN, self.twilio_auth_token.as_deref()),
            (TWILIO_PHONE_NUMBER, self.twilio_number.as_deref()),
            (NOTIFICATION_NUMBER, self.notification_number.as_deref()),
        ]
    }

    /// Configuration gate: every required key is present and non-empty.
    pub fn is_ready(&self) -> bool {
        self.missing_keys().is_empty()
    }

    /// Names of the required keys that are unset or empty.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        self.required()
            .into_iter()
            .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
            .map(|(key, _)| key)
            .collect()
    }

    /// Every recognized key with credential-like values replaced by [`MASK`].
    ///
    /// Unset keys are reported as `null`.
    pub fn masked_vars(&self) -> BTreeMap<&'static str, Value> {
        let mut vars: BTreeMap<&'static str, Value> = self
            .required()
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Some(_) if is_sensitive_key(key) => Value::from(MASK),
                    Some(v) => Value::from(v),
                    None => Value::Null,
                };
                (key, value)
            })
            .collect();
        vars.insert(SEND_NOTIFICATIONS, Value::from(u8::from(self.send_notifications)));
        vars
    }
}

/// Whether a configuration key name looks like it holds a credential.
pub fn is_sensitive_key(key: &str) -> bool {
    let upper = key.to_uppercase();
    SENSITIVE_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Startup-only settings for the HTTP status surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen port (default: 5000)
    pub port: u16,

    /// Label shown in the banner (default: "Deis")
    pub powered_by: String,

    /// Release identifier shown in the banner (default: "unknown")
    pub release: String,
}

impl ServerConfig {
    /// Load server settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            powered_by: lookup("POWERED_BY").unwrap_or_else(|| "Deis".to_string()),
            release: lookup("WORKFLOW_RELEASE").unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            powered_by: "Deis".to_string(),
            release: "unknown".to_string(),
        }
    }
}

/// Source of the per-cycle configuration.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> NotifierConfig;
}

/// Reads [`NotifierConfig`] from the live process environment on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigSource;

impl ConfigSource for EnvConfigSource {
    fn load(&self) -> NotifierConfig {
        NotifierConfig::from_env()
    }
}

/// Always returns the same configuration.
impl ConfigSource for NotifierConfig {
    fn load(&self) -> NotifierConfig {
        self.clone()
    }
}
